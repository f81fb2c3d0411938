//! User document schema
//!
//! Holds the per-user relationship sets the follow workflow operates on.
//! `sent_requests` mirrors the recipient-side `follow_requests` entries
//! for this user's outgoing requests; the upstream schema never declared
//! it even though the workflow depends on it, so it is a first-class
//! field here (see DESIGN.md).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable external user identifier
    pub user_id: String,

    /// Display name
    pub username: String,

    /// Avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Profile bio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Declared interests
    #[serde(default)]
    pub interests: Vec<String>,

    /// Ids of users who follow this user
    #[serde(default)]
    pub follower: Vec<String>,

    /// Ids of users this user follows
    #[serde(default)]
    pub following: Vec<String>,

    /// Incoming pending follow requests
    #[serde(default)]
    pub follow_requests: Vec<String>,

    /// Outgoing pending follow requests (mirror of the recipient-side
    /// `follow_requests` entries)
    #[serde(default)]
    pub sent_requests: Vec<String>,
}

impl UserDoc {
    /// Public profile projection returned by list endpoints
    pub fn profile(&self) -> ProfileView {
        ProfileView {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
            interests: self.interests.clone(),
        }
    }

    /// Whether `other` appears in this user's follower set
    pub fn has_follower(&self, other: &str) -> bool {
        self.follower.iter().any(|id| id == other)
    }

    /// Whether this user follows `other`
    pub fn is_following(&self, other: &str) -> bool {
        self.following.iter().any(|id| id == other)
    }

    /// Whether `other` has a pending request to this user
    pub fn has_pending_request_from(&self, other: &str) -> bool {
        self.follow_requests.iter().any(|id| id == other)
    }
}

/// Profile projection (username, avatar, bio, interests)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileView {
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub interests: Vec<String>,
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .name("username_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
