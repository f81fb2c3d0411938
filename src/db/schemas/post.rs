//! Post document schema
//!
//! Posts are owned by the content service; grapevine only consumes the
//! engagement fields (`likes`, `comments`, `created_at`) for ranking.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// A comment embedded in a post document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentEntry {
    pub comment_id: String,
    pub user: String,
    pub text: String,
    pub created_at: DateTime,
}

/// Post document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique post identifier
    pub post_id: String,

    /// Author user id
    pub author: String,

    /// Post body
    #[serde(default)]
    pub content: String,

    /// Ids of users who liked this post
    #[serde(default)]
    pub likes: Vec<String>,

    /// Ordered comments
    #[serde(default)]
    pub comments: Vec<CommentEntry>,

    /// Creation time
    pub created_at: DateTime,
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "post_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("post_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_desc_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
