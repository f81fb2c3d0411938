//! Duplex channel event envelopes
//!
//! JSON text frames with an `{event, data}` envelope in both
//! directions. Event names are a compatibility contract:
//!
//! Server -> client:
//! - `unread_notifications` - bulk unread dump on connect
//! - `new_notification` - live push of a just-persisted record
//! - `notification` - lightweight `{type, from, timestamp}` shorthand
//!   fired on the like/comment path in addition to `new_notification`
//! - `message_sent` - echo of a sent direct message to its sender
//! - `receive_message` - direct message pushed to its recipient
//! - `error` - plain string error
//!
//! Client -> server:
//! - `mark_notification_read` - `{notification_id}`
//! - `send_message` - `{to, text}`

use futures_util::SinkExt;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::db::schemas::{MessageView, NotificationView};
use crate::presence::WsSink;

/// Events pushed from server to client
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    UnreadNotifications(Vec<NotificationView>),
    NewNotification(NotificationView),
    Notification(ShorthandPush),
    MessageSent(MessageView),
    ReceiveMessage(MessageView),
    Error(String),
}

/// The lightweight shorthand push used by the like/comment path
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShorthandPush {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub from: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Events received from the client
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    MarkNotificationRead { notification_id: String },
    SendMessage { to: String, text: String },
}

/// Serialize and push an event over a connection. Best effort: a send
/// failure means the connection is gone and is reported as `false`.
pub async fn push(sink: &WsSink, event: &ServerEvent) -> bool {
    let payload = match serde_json::to_string(event) {
        Ok(p) => p,
        Err(e) => {
            debug!("event serialization failed: {}", e);
            return false;
        }
    };

    sink.lock().await.send(Message::Text(payload)).await.is_ok()
}
