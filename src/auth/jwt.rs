//! JWT verification
//!
//! HS256 bearer tokens issued by the account service. Tokens arrive
//! either as `?token=...` on the WebSocket handshake URL or as an
//! `Authorization: Bearer` header on REST calls.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{GrapevineError, Result};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id
    pub sub: String,
    /// Display username
    pub username: String,
    /// Expiry (seconds since epoch)
    pub exp: usize,
}

/// Verifies HS256 access tokens
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Create a validator for the given shared secret
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| GrapevineError::Auth(format!("invalid token: {}", e)))
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").map(str::trim)
}

/// Extract a token from a query string (`?token=...`)
pub fn extract_token_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == "token" {
                return Some(value.to_string());
            }
        }
    }
    None
}
