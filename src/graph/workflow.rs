//! Follow workflow orchestration
//!
//! Snapshot both users, plan the transition, apply the planned set
//! mutations, then run follow-on effects (notification fan-out and the
//! accept cascade's reciprocal request).
//!
//! Checks here are check-then-act over independent document snapshots:
//! two concurrent requests for the same pair can both pass validation
//! before either write lands. That matches the documented concurrency
//! model of the service.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::ProfileView;
use crate::error::Result;
use crate::graph::plan::{self, Effect, FollowStatus};
use crate::graph::store::GraphStore;
use crate::notify::{NotificationEvent, NotificationService};

/// Follow request / accept / reject / unfollow operations over the
/// social graph store
#[derive(Clone)]
pub struct FollowWorkflow {
    store: GraphStore,
    notify: Arc<NotificationService>,
}

impl FollowWorkflow {
    pub fn new(store: GraphStore, notify: Arc<NotificationService>) -> Self {
        Self { store, notify }
    }

    /// Send a follow request `from -> to` and notify the recipient.
    pub async fn send_follow_request(&self, from_id: &str, to_id: &str) -> Result<()> {
        let from = self.store.get_user(from_id).await?;
        let to = self.store.get_user(to_id).await?;

        let plan = plan::plan_send_request(&from, &to)?;
        self.store.apply(&plan.updates).await?;
        self.run_effects(plan.effects).await?;

        info!(from = from_id, to = to_id, "follow request sent");
        Ok(())
    }

    /// Accept a pending request from `from_id`. When the accepting user
    /// does not already follow the requester, a fresh reciprocal request
    /// is issued (with its own notification) - the upstream cascade,
    /// reproduced exactly.
    pub async fn accept_follow_request(&self, user_id: &str, from_id: &str) -> Result<()> {
        let user = self.store.get_user(user_id).await?;
        let from = self.store.get_user(from_id).await?;

        let plan = plan::plan_accept(&user, &from)?;
        self.store.apply(&plan.updates).await?;
        self.run_effects(plan.effects).await?;

        info!(user = user_id, from = from_id, "follow request accepted");
        Ok(())
    }

    /// Reject a pending request from `from_id`.
    pub async fn reject_follow_request(&self, user_id: &str, from_id: &str) -> Result<()> {
        let user = self.store.get_user(user_id).await?;
        let from = self.store.get_user(from_id).await?;

        let plan = plan::plan_reject(&user, &from)?;
        self.store.apply(&plan.updates).await?;

        info!(user = user_id, from = from_id, "follow request rejected");
        Ok(())
    }

    /// Remove the active edge `user -> target`.
    pub async fn unfollow(&self, user_id: &str, target_id: &str) -> Result<()> {
        let user = self.store.get_user(user_id).await?;
        let target = self.store.get_user(target_id).await?;

        let plan = plan::plan_unfollow(&user, &target)?;
        self.store.apply(&plan.updates).await?;

        info!(user = user_id, target = target_id, "unfollowed");
        Ok(())
    }

    /// Profile projections of the user's pending incoming requests.
    pub async fn incoming_requests(&self, user_id: &str) -> Result<Vec<ProfileView>> {
        let user = self.store.get_user(user_id).await?;
        self.store.profiles(&user.follow_requests).await
    }

    /// Followers of `target`, visible to the target and its followers.
    pub async fn followers(&self, viewer_id: &str, target_id: &str) -> Result<Vec<ProfileView>> {
        let target = self.store.get_user(target_id).await?;
        plan::check_connection_access(viewer_id, &target)?;
        self.store.profiles(&target.follower).await
    }

    /// Users `target` follows, visible to the target and its followers.
    pub async fn following(&self, viewer_id: &str, target_id: &str) -> Result<Vec<ProfileView>> {
        let target = self.store.get_user(target_id).await?;
        plan::check_connection_access(viewer_id, &target)?;
        self.store.profiles(&target.following).await
    }

    /// Intersection of the two parties' follower sets, as profiles.
    pub async fn mutuals(&self, viewer_id: &str, target_id: &str) -> Result<Vec<ProfileView>> {
        let viewer = self.store.get_user(viewer_id).await?;
        let target = self.store.get_user(target_id).await?;
        let ids = plan::mutual_ids(&viewer, &target);
        self.store.profiles(&ids).await
    }

    /// Relationship of `user` to `target`.
    pub async fn follow_status(&self, user_id: &str, target_id: &str) -> Result<FollowStatus> {
        let user = self.store.get_user(user_id).await?;
        let target = self.store.get_user(target_id).await?;
        Ok(plan::follow_status(&user, &target))
    }

    async fn run_effects(&self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::FollowRequestNotification { to, from } => {
                    // Fan-out failure does not roll back the edge mutation
                    if let Err(e) = self
                        .notify
                        .trigger(&to, NotificationEvent::FollowRequest { from })
                        .await
                    {
                        warn!(to = %to, "follow request notification failed: {}", e);
                    }
                }
                Effect::ReciprocalRequest { from, to } => {
                    Box::pin(self.send_follow_request(&from, &to)).await?;
                }
            }
        }
        Ok(())
    }
}
