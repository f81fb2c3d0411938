//! Social graph store
//!
//! Typed access to the `users` collection. Every relationship-set
//! mutation is applied as a single atomic `$addToSet`/`$pull` update on
//! one document; the two documents of one logical edge remain
//! independent updates (last-write-wins, no cross-document transaction).

use bson::{doc, Document};

use crate::db::schemas::{ProfileView, UserDoc, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::error::{GrapevineError, Result};
use crate::graph::plan::{GraphUpdate, SetOp};

/// Store over the per-user relationship sets
#[derive(Clone)]
pub struct GraphStore {
    users: MongoCollection<UserDoc>,
}

impl GraphStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }

    /// Fetch a user, failing with `NotFound` when absent
    pub async fn get_user(&self, user_id: &str) -> Result<UserDoc> {
        self.users
            .find_one(doc! { "user_id": user_id })
            .await?
            .ok_or_else(|| GrapevineError::NotFound(format!("user {}", user_id)))
    }

    /// Apply planned set mutations, one atomic update per entry
    pub async fn apply(&self, updates: &[GraphUpdate]) -> Result<()> {
        for update in updates {
            let modification: Document = match &update.op {
                SetOp::Add(member) => doc! {
                    "$addToSet": { update.field.as_key(): member }
                },
                SetOp::Remove(member) => doc! {
                    "$pull": { update.field.as_key(): member }
                },
            };
            self.users
                .update_one(doc! { "user_id": &update.user_id }, modification)
                .await?;
        }
        Ok(())
    }

    /// Resolve a list of user ids to profile projections, preserving the
    /// input order. Unknown ids are silently skipped.
    pub async fn profiles(&self, ids: &[String]) -> Result<Vec<ProfileView>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .users
            .find_many(doc! { "user_id": { "$in": ids } })
            .await?;

        let mut by_id: std::collections::HashMap<String, ProfileView> = found
            .into_iter()
            .map(|u| (u.user_id.clone(), u.profile()))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
