//! Notification routes
//!
//! - `GET  /api/v1/notifications/unread`
//! - `POST /api/v1/notifications/{id}/read`

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde_json::json;

use crate::auth::Claims;
use crate::db::schemas::NotificationView;
use crate::routes::{error_response, json_response};
use crate::server::AppState;

pub async fn handle_unread_notifications(
    state: &AppState,
    claims: &Claims,
) -> Response<Full<Bytes>> {
    match state.notify.unread(&claims.sub).await {
        Ok(records) => {
            let views: Vec<NotificationView> = records.iter().map(|r| r.view()).collect();
            json_response(&views)
        }
        Err(e) => error_response(&e),
    }
}

pub async fn handle_mark_notification_read(
    state: &AppState,
    claims: &Claims,
    notification_id: &str,
) -> Response<Full<Bytes>> {
    match state.notify.mark_read(&claims.sub, notification_id).await {
        Ok(()) => json_response(&json!({ "status": "read" })),
        Err(e) => error_response(&e),
    }
}
