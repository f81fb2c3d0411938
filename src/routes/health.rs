//! Health, readiness, and version probes

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::json;

use crate::server::AppState;

/// Liveness probe - 200 whenever the process is serving
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let body = json!({
        "status": "ok",
        "node_id": state.args.node_id.to_string(),
        "connections": state.presence.connection_count(),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Readiness probe - 200 only when MongoDB is reachable
pub async fn readiness_check(state: &AppState) -> Response<Full<Bytes>> {
    let (status, body) = match state.mongo.ping().await {
        Ok(()) => (StatusCode::OK, json!({ "status": "ready" })),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "not ready", "error": e.to_string() }),
        ),
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Build info for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let body = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_SHORT"),
        "built_at": env!("BUILD_TIMESTAMP"),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
