//! Direct message document schema
//!
//! Messages are created only after the messaging gate authorizes the
//! pair and are immutable thereafter.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for direct messages
pub const MESSAGE_COLLECTION: &str = "messages";

/// Direct message document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique message identifier
    pub message_id: String,

    /// Sender user id
    pub from: String,

    /// Recipient user id
    pub to: String,

    /// Message text
    pub text: String,

    /// Creation time
    pub created_at: DateTime,
}

impl MessageDoc {
    /// Client-facing projection sent over the wire
    pub fn view(&self) -> MessageView {
        MessageView {
            message_id: self.message_id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            text: self.text.clone(),
            timestamp: self.created_at.timestamp_millis(),
        }
    }
}

/// Client-facing message payload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageView {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub text: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl IntoIndexes for MessageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "message_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("message_id_unique".to_string())
                        .build(),
                ),
            ),
            // Chat history fetch for a pair, ordered by time
            (
                doc! { "from": 1, "to": 1, "created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("pair_history_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MessageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
