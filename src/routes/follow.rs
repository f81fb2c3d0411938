//! Follow workflow routes
//!
//! - `POST /api/v1/follow/request/{target}`
//! - `POST /api/v1/follow/accept/{from}`
//! - `POST /api/v1/follow/reject/{from}`
//! - `POST /api/v1/follow/unfollow/{target}`
//! - `GET  /api/v1/follow/requests`
//! - `GET  /api/v1/follow/status/{target}`
//! - `GET  /api/v1/users/{target}/followers`
//! - `GET  /api/v1/users/{target}/following`
//! - `GET  /api/v1/users/{target}/mutuals`

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde_json::json;

use crate::auth::Claims;
use crate::routes::{error_response, json_response};
use crate::server::AppState;

pub async fn handle_follow_request(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.send_follow_request(&claims.sub, target).await {
        Ok(()) => json_response(&json!({ "status": "requested" })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_follow_accept(
    state: &AppState,
    claims: &Claims,
    from: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.accept_follow_request(&claims.sub, from).await {
        Ok(()) => json_response(&json!({ "status": "accepted" })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_follow_reject(
    state: &AppState,
    claims: &Claims,
    from: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.reject_follow_request(&claims.sub, from).await {
        Ok(()) => json_response(&json!({ "status": "rejected" })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_unfollow(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.unfollow(&claims.sub, target).await {
        Ok(()) => json_response(&json!({ "status": "unfollowed" })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_incoming_requests(state: &AppState, claims: &Claims) -> Response<Full<Bytes>> {
    match state.workflow.incoming_requests(&claims.sub).await {
        Ok(profiles) => json_response(&profiles),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_follow_status(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.follow_status(&claims.sub, target).await {
        Ok(status) => json_response(&json!({ "status": status })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_followers(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.followers(&claims.sub, target).await {
        Ok(profiles) => json_response(&profiles),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_following(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.following(&claims.sub, target).await {
        Ok(profiles) => json_response(&profiles),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_mutuals(
    state: &AppState,
    claims: &Claims,
    target: &str,
) -> Response<Full<Bytes>> {
    match state.workflow.mutuals(&claims.sub, target).await {
        Ok(profiles) => json_response(&profiles),
        Err(e) => error_response(&e),
    }
}
