//! REST route handlers
//!
//! Thin wrappers over the workflow and delivery services. Handlers take
//! the verified claims of the calling user and return plain
//! `Response<Full<Bytes>>` values; error mapping to HTTP status happens
//! in [`error_response`].

pub mod follow;
pub mod health;
pub mod notifications;
pub mod posts;

pub use follow::*;
pub use health::*;
pub use notifications::*;
pub use posts::*;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::GrapevineError;

/// Build a successful JSON response
pub fn json_response<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(data).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"internal error"}"#)))
                .unwrap()
        })
}

/// Map a service error to its client-facing JSON response
pub fn error_response(err: &GrapevineError) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": err.to_string() });
    Response::builder()
        .status(err.status())
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"internal error"}"#)))
                .unwrap()
        })
}

/// Extract the final path segment after a prefix, rejecting empty or
/// nested remainders.
///
/// `path_segment("/api/v1/follow/accept/alice", "/api/v1/follow/accept/")`
/// yields `Some("alice")`.
pub fn path_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

/// Parse `/api/v1/users/{target}/{tail}` into (target, tail)
pub fn parse_user_route(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/api/v1/users/")?;
    let (target, tail) = rest.split_once('/')?;
    if target.is_empty() || tail.is_empty() || tail.contains('/') {
        return None;
    }
    Some((target, tail))
}

/// Parse a `limit` query parameter, if present and numeric
pub fn parse_limit(query: Option<&str>) -> Option<usize> {
    let query = query?;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == "limit" {
                return value.parse().ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(
            path_segment("/api/v1/follow/accept/alice", "/api/v1/follow/accept/"),
            Some("alice")
        );
        assert_eq!(
            path_segment("/api/v1/follow/accept/", "/api/v1/follow/accept/"),
            None
        );
        assert_eq!(
            path_segment("/api/v1/follow/accept/a/b", "/api/v1/follow/accept/"),
            None
        );
        assert_eq!(path_segment("/other", "/api/v1/follow/accept/"), None);
    }

    #[test]
    fn test_parse_user_route() {
        assert_eq!(
            parse_user_route("/api/v1/users/bob/followers"),
            Some(("bob", "followers"))
        );
        assert_eq!(
            parse_user_route("/api/v1/users/bob/mutuals"),
            Some(("bob", "mutuals"))
        );
        assert_eq!(parse_user_route("/api/v1/users/bob"), None);
        assert_eq!(parse_user_route("/api/v1/users//followers"), None);
        assert_eq!(parse_user_route("/api/v1/users/bob/followers/x"), None);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(Some("limit=25")), Some(25));
        assert_eq!(parse_limit(Some("skip=2&limit=5")), Some(5));
        assert_eq!(parse_limit(Some("limit=abc")), None);
        assert_eq!(parse_limit(None), None);
    }

    #[test]
    fn test_error_response_status() {
        let resp = error_response(&GrapevineError::AccessDenied("nope".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
