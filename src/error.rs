//! Error types for grapevine
//!
//! One taxonomy for the whole service. Workflow validation failures map
//! to client-facing 4xx responses at the routing layer; infrastructure
//! failures map to 500.

use hyper::StatusCode;
use thiserror::Error;

/// The primary error type for all grapevine operations.
#[derive(Error, Debug)]
pub enum GrapevineError {
    /// Missing or invalid bearer credential
    #[error("unauthorized: {0}")]
    Auth(String),

    /// Operation rejected by workflow rules (duplicate request,
    /// unfollow when not following, message to a non-mutual)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No such user, pending request, notification, or post
    #[error("not found: {0}")]
    NotFound(String),

    /// Viewer is not allowed to see the requested data
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// MongoDB failure
    #[error("database error: {0}")]
    Database(String),

    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GrapevineError {
    /// HTTP status code this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            GrapevineError::Auth(_) => StatusCode::UNAUTHORIZED,
            GrapevineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GrapevineError::NotFound(_) => StatusCode::NOT_FOUND,
            GrapevineError::AccessDenied(_) => StatusCode::FORBIDDEN,
            GrapevineError::Database(_) | GrapevineError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// A specialized Result type for grapevine logic.
pub type Result<T> = std::result::Result<T, GrapevineError>;
