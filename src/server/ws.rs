//! WebSocket connection lifecycle
//!
//! The handshake verifies the bearer credential before anything touches
//! the presence registry. A failed credential is rejected with 401 and
//! no upgrade. After the upgrade the connection is registered, receives
//! its bulk unread dump, and then serves client events until disconnect.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::auth::{extract_token_from_header, extract_token_from_query, Claims};
use crate::db::schemas::NotificationView;
use crate::error::GrapevineError;
use crate::events::{self, ClientEvent, ServerEvent};
use crate::presence::WsSink;
use crate::server::AppState;

/// Authenticate and upgrade a WebSocket handshake request
pub async fn handle_upgrade(
    state: Arc<AppState>,
    mut req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let claims = match authenticate_handshake(&state, &req) {
        Ok(c) => c,
        Err(e) => {
            debug!("rejected handshake: {}", e);
            return reject(StatusCode::UNAUTHORIZED, &e.to_string());
        }
    };

    if state.presence.is_at_capacity() {
        warn!(
            user = %claims.sub,
            "rejecting connection: registry at capacity"
        );
        return reject(StatusCode::SERVICE_UNAVAILABLE, "server at capacity");
    }

    match hyper_tungstenite::upgrade(&mut req, None) {
        Ok((response, websocket)) => {
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => handle_connection(state, ws, claims).await,
                    Err(e) => warn!("websocket upgrade failed: {}", e),
                }
            });
            response
        }
        Err(e) => {
            warn!("websocket handshake error: {}", e);
            reject(StatusCode::BAD_REQUEST, "invalid websocket handshake")
        }
    }
}

/// Credential check for the handshake. Token comes from `?token=` or
/// the Authorization header.
fn authenticate_handshake(
    state: &AppState,
    req: &Request<Incoming>,
) -> crate::error::Result<Claims> {
    if let Some(token) = extract_token_from_query(req.uri().query()) {
        return state.jwt.verify(&token);
    }

    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Some(token) = extract_token_from_header(header) {
        return state.jwt.verify(token);
    }

    Err(GrapevineError::Auth("missing token".to_string()))
}

/// Serve an upgraded connection until it closes
async fn handle_connection(
    state: Arc<AppState>,
    ws: hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>,
    claims: Claims,
) {
    let user_id = claims.sub;
    let (write, mut read) = ws.split();
    let sink: WsSink = Arc::new(Mutex::new(write));

    let conn_id = state.presence.register(&user_id, Arc::clone(&sink));
    info!(user = %user_id, "connected");

    // Bulk unread dump on connect
    match state.notify.unread(&user_id).await {
        Ok(records) => {
            let views: Vec<NotificationView> = records.iter().map(|r| r.view()).collect();
            events::push(&sink, &ServerEvent::UnreadNotifications(views)).await;
        }
        Err(e) => {
            warn!(user = %user_id, "unread dump failed: {}", e);
        }
    }

    while let Some(frame) = read.next().await {
        let msg = match frame {
            Ok(m) => m,
            Err(e) => {
                debug!(user = %user_id, "read error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_client_event(&state, &user_id, &sink, &text).await;
            }
            Message::Ping(data) => {
                let _ = sink.lock().await.send(Message::Pong(data)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.presence.unregister(&user_id, conn_id);
    let _ = sink.lock().await.close().await;
    info!(user = %user_id, "disconnected");
}

/// Dispatch one client text frame. Failures go back over the same
/// connection as `error` events rather than tearing it down.
async fn handle_client_event(state: &AppState, user_id: &str, sink: &WsSink, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(e) => e,
        Err(e) => {
            events::push(sink, &ServerEvent::Error(format!("invalid event: {}", e))).await;
            return;
        }
    };

    match event {
        ClientEvent::MarkNotificationRead { notification_id } => {
            if let Err(e) = state.notify.mark_read(user_id, &notification_id).await {
                events::push(sink, &ServerEvent::Error(e.to_string())).await;
            }
        }
        ClientEvent::SendMessage { to, text } => {
            if let Err(e) = state.chat.send_message(user_id, &to, &text).await {
                events::push(sink, &ServerEvent::Error(e.to_string())).await;
            }
        }
    }
}

fn reject(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(format!(r#"{{"error":"{}"}}"#, msg))))
        .unwrap()
}
