//! Notification document schema
//!
//! Sparse records: only the fields relevant to the notification kind are
//! stored, absent optionals are omitted entirely. Notifications are
//! created by the fan-out engine, flipped to read by the mark-read
//! operation, and never deleted in normal flow.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

/// Notification kinds
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Mention,
    Message,
    FollowRequest,
    Suggestion,
}

impl NotificationKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Mention => "mention",
            NotificationKind::Message => "message",
            NotificationKind::FollowRequest => "follow_request",
            NotificationKind::Suggestion => "suggestion",
        }
    }
}

/// Notification document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotificationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique notification identifier
    pub notification_id: String,

    /// Receiving user id
    pub user: String,

    /// Notification kind
    pub kind: NotificationKind,

    /// Originating user id, when the kind has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Referenced post, when the kind has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,

    /// Referenced comment, when the kind has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,

    /// Free-text message, when the kind has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Whether the recipient has seen this notification
    #[serde(default)]
    pub read: bool,

    /// Creation time
    pub created_at: DateTime,
}

impl NotificationDoc {
    /// Client-facing projection pushed over the wire and returned by the
    /// unread fetch
    pub fn view(&self) -> NotificationView {
        NotificationView {
            notification_id: self.notification_id.clone(),
            kind: self.kind,
            from: self.from.clone(),
            post_id: self.post_id.clone(),
            comment_id: self.comment_id.clone(),
            message: self.message.clone(),
            read: self.read,
            timestamp: self.created_at.timestamp_millis(),
        }
    }
}

/// Client-facing notification payload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotificationView {
    pub notification_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub read: bool,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "notification_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("notification_id_unique".to_string())
                        .build(),
                ),
            ),
            // Unread fetch: filter by recipient + read flag, newest first
            (
                doc! { "user": 1, "read": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_unread_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for NotificationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_serialization_omits_absent_fields() {
        let doc = NotificationDoc {
            _id: None,
            metadata: Metadata::default(),
            notification_id: "n-1".to_string(),
            user: "bob".to_string(),
            kind: NotificationKind::FollowRequest,
            from: Some("alice".to_string()),
            post_id: None,
            comment_id: None,
            message: None,
            read: false,
            created_at: DateTime::now(),
        };

        let json = serde_json::to_value(&doc).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("from"));
        assert!(!obj.contains_key("post_id"));
        assert!(!obj.contains_key("comment_id"));
        assert!(!obj.contains_key("message"));
        assert_eq!(json["kind"], "follow_request");
    }

    #[test]
    fn test_view_renames_kind_to_type() {
        let doc = NotificationDoc {
            _id: None,
            metadata: Metadata::default(),
            notification_id: "n-2".to_string(),
            user: "bob".to_string(),
            kind: NotificationKind::Like,
            from: Some("alice".to_string()),
            post_id: Some("p-1".to_string()),
            comment_id: None,
            message: None,
            read: false,
            created_at: DateTime::now(),
        };

        let json = serde_json::to_value(doc.view()).unwrap();
        assert_eq!(json["type"], "like");
        assert_eq!(json["from"], "alice");
        assert_eq!(json["post_id"], "p-1");
        assert_eq!(json["read"], false);
    }
}
