//! Follow workflow transition planning
//!
//! Pure decision logic for the follow state machine. Each operation
//! inspects a snapshot of the two users' relationship sets and either
//! fails with the operation's error or yields an explicit
//! [`FollowPlan`]: the set mutations to apply plus any follow-on
//! effects (notifications, the reciprocal request issued on accept).
//!
//! State per ordered pair (A,B): none -> requested -> {following | none}.
//!
//! Two upstream quirks are preserved deliberately (see DESIGN.md):
//! accepting a request issues a fresh reciprocal request instead of
//! establishing a mutual follow directly, and rejecting a request also
//! pulls the requester from the rejecter's `following` set even when it
//! was never there.

use serde::Serialize;

use crate::db::schemas::UserDoc;
use crate::error::{GrapevineError, Result};

/// Which relationship set a [`GraphUpdate`] touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    Follower,
    Following,
    FollowRequests,
    SentRequests,
}

impl SetField {
    /// Document field name backing this set
    pub fn as_key(&self) -> &'static str {
        match self {
            SetField::Follower => "follower",
            SetField::Following => "following",
            SetField::FollowRequests => "follow_requests",
            SetField::SentRequests => "sent_requests",
        }
    }
}

/// Membership change applied to one set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOp {
    Add(String),
    Remove(String),
}

/// One atomic mutation of one user document's relationship set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphUpdate {
    pub user_id: String,
    pub field: SetField,
    pub op: SetOp,
}

impl GraphUpdate {
    fn add(user_id: &str, field: SetField, member: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            field,
            op: SetOp::Add(member.to_string()),
        }
    }

    fn remove(user_id: &str, field: SetField, member: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            field,
            op: SetOp::Remove(member.to_string()),
        }
    }
}

/// Follow-on effect of a workflow operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit a `follow_request` notification to `to`
    FollowRequestNotification { to: String, from: String },
    /// Accept's cascade: issue a brand-new follow request `from -> to`
    ReciprocalRequest { from: String, to: String },
}

/// Outcome of planning a workflow operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowPlan {
    pub updates: Vec<GraphUpdate>,
    pub effects: Vec<Effect>,
}

/// Relationship of `user` to `target`, highest-priority match first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FollowStatus {
    /// Mutual follow in both directions
    #[serde(rename = "connected")]
    Connected,
    /// Outgoing request pending with `target`
    #[serde(rename = "Requested")]
    Requested,
    /// `target` has a request pending with `user`
    #[serde(rename = "incoming request")]
    IncomingRequest,
    #[serde(rename = "not following")]
    NotFollowing,
}

/// Plan `send_follow_request(from, to)`.
///
/// Fails with `InvalidRequest` when `to` already has a pending request
/// from or is already followed by `from`.
pub fn plan_send_request(from: &UserDoc, to: &UserDoc) -> Result<FollowPlan> {
    if to.has_pending_request_from(&from.user_id) {
        return Err(GrapevineError::InvalidRequest(
            "follow request already pending".to_string(),
        ));
    }
    if to.has_follower(&from.user_id) {
        return Err(GrapevineError::InvalidRequest(
            "already following this user".to_string(),
        ));
    }

    Ok(FollowPlan {
        updates: vec![
            GraphUpdate::add(&to.user_id, SetField::FollowRequests, &from.user_id),
            GraphUpdate::add(&from.user_id, SetField::SentRequests, &to.user_id),
        ],
        effects: vec![Effect::FollowRequestNotification {
            to: to.user_id.clone(),
            from: from.user_id.clone(),
        }],
    })
}

/// Plan `accept_follow_request(user, from)`.
///
/// Fails with `NotFound` when no such request is pending. On success
/// the pending pair is cleared, the edge `from -> user` becomes active,
/// and - when `user` does not already follow `from` - a reciprocal
/// request effect is emitted instead of a direct mutual follow.
pub fn plan_accept(user: &UserDoc, from: &UserDoc) -> Result<FollowPlan> {
    if !user.has_pending_request_from(&from.user_id) {
        return Err(GrapevineError::NotFound(
            "no pending follow request".to_string(),
        ));
    }

    let updates = vec![
        GraphUpdate::remove(&user.user_id, SetField::FollowRequests, &from.user_id),
        GraphUpdate::remove(&from.user_id, SetField::SentRequests, &user.user_id),
        GraphUpdate::add(&user.user_id, SetField::Follower, &from.user_id),
        GraphUpdate::add(&from.user_id, SetField::Following, &user.user_id),
    ];

    let effects = if user.is_following(&from.user_id) {
        Vec::new()
    } else {
        vec![Effect::ReciprocalRequest {
            from: user.user_id.clone(),
            to: from.user_id.clone(),
        }]
    };

    Ok(FollowPlan { updates, effects })
}

/// Plan `reject_follow_request(user, from)`.
///
/// Fails with `NotFound` when no such request is pending. The pull of
/// `from` from `user.following` (and its mirror on `from.follower`) is
/// a no-op in normal state and is kept as observed upstream.
pub fn plan_reject(user: &UserDoc, from: &UserDoc) -> Result<FollowPlan> {
    if !user.has_pending_request_from(&from.user_id) {
        return Err(GrapevineError::NotFound(
            "no pending follow request".to_string(),
        ));
    }

    Ok(FollowPlan {
        updates: vec![
            GraphUpdate::remove(&user.user_id, SetField::FollowRequests, &from.user_id),
            GraphUpdate::remove(&user.user_id, SetField::Following, &from.user_id),
            GraphUpdate::remove(&from.user_id, SetField::SentRequests, &user.user_id),
            GraphUpdate::remove(&from.user_id, SetField::Follower, &user.user_id),
        ],
        effects: Vec::new(),
    })
}

/// Plan `unfollow(user, target)`.
///
/// Fails with `InvalidRequest` when `user` does not follow `target`.
pub fn plan_unfollow(user: &UserDoc, target: &UserDoc) -> Result<FollowPlan> {
    if !user.is_following(&target.user_id) {
        return Err(GrapevineError::InvalidRequest(
            "not following this user".to_string(),
        ));
    }

    Ok(FollowPlan {
        updates: vec![
            GraphUpdate::remove(&user.user_id, SetField::Following, &target.user_id),
            GraphUpdate::remove(&target.user_id, SetField::Follower, &user.user_id),
        ],
        effects: Vec::new(),
    })
}

/// Access check for follower/following list reads: the viewer must be
/// the target or one of the target's followers.
pub fn check_connection_access(viewer_id: &str, target: &UserDoc) -> Result<()> {
    if viewer_id == target.user_id || target.has_follower(viewer_id) {
        Ok(())
    } else {
        Err(GrapevineError::AccessDenied(
            "only followers can view this list".to_string(),
        ))
    }
}

/// Ids in both parties' *follower* sets. Intersecting the follower sets
/// (not follower x following) is the observed upstream semantics,
/// preserved literally.
pub fn mutual_ids(viewer: &UserDoc, target: &UserDoc) -> Vec<String> {
    viewer
        .follower
        .iter()
        .filter(|id| target.has_follower(id))
        .cloned()
        .collect()
}

/// Evaluate `follow_status(user, target)` in priority order.
pub fn follow_status(user: &UserDoc, target: &UserDoc) -> FollowStatus {
    if user.is_following(&target.user_id) && target.is_following(&user.user_id) {
        FollowStatus::Connected
    } else if target.has_pending_request_from(&user.user_id) {
        FollowStatus::Requested
    } else if user.has_pending_request_from(&target.user_id) {
        FollowStatus::IncomingRequest
    } else {
        FollowStatus::NotFollowing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserDoc {
        UserDoc {
            user_id: id.to_string(),
            username: id.to_string(),
            ..Default::default()
        }
    }

    fn apply_local(plan: &FollowPlan, users: &mut [&mut UserDoc]) {
        // Mirror of what the store does, against in-memory docs
        for update in &plan.updates {
            for u in users.iter_mut() {
                if u.user_id != update.user_id {
                    continue;
                }
                let set = match update.field {
                    SetField::Follower => &mut u.follower,
                    SetField::Following => &mut u.following,
                    SetField::FollowRequests => &mut u.follow_requests,
                    SetField::SentRequests => &mut u.sent_requests,
                };
                match &update.op {
                    SetOp::Add(id) => {
                        if !set.contains(id) {
                            set.push(id.clone());
                        }
                    }
                    SetOp::Remove(id) => set.retain(|x| x != id),
                }
            }
        }
    }

    #[test]
    fn test_send_request_happy_path() {
        let alice = user("alice");
        let bob = user("bob");

        let plan = plan_send_request(&alice, &bob).unwrap();
        assert_eq!(
            plan.updates,
            vec![
                GraphUpdate::add("bob", SetField::FollowRequests, "alice"),
                GraphUpdate::add("alice", SetField::SentRequests, "bob"),
            ]
        );
        assert_eq!(
            plan.effects,
            vec![Effect::FollowRequestNotification {
                to: "bob".to_string(),
                from: "alice".to_string(),
            }]
        );
    }

    #[test]
    fn test_send_request_duplicate_pending_fails() {
        let alice = user("alice");
        let mut bob = user("bob");
        bob.follow_requests.push("alice".to_string());

        let err = plan_send_request(&alice, &bob).unwrap_err();
        assert!(matches!(err, GrapevineError::InvalidRequest(_)));
    }

    #[test]
    fn test_send_request_already_following_fails() {
        let alice = user("alice");
        let mut bob = user("bob");
        bob.follower.push("alice".to_string());

        let err = plan_send_request(&alice, &bob).unwrap_err();
        assert!(matches!(err, GrapevineError::InvalidRequest(_)));
    }

    #[test]
    fn test_accept_without_pending_fails() {
        let alice = user("alice");
        let bob = user("bob");

        let err = plan_accept(&bob, &alice).unwrap_err();
        assert!(matches!(err, GrapevineError::NotFound(_)));
    }

    #[test]
    fn test_accept_establishes_edge_and_symmetry() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        bob.follow_requests.push("alice".to_string());
        alice.sent_requests.push("bob".to_string());

        let plan = plan_accept(&bob, &alice).unwrap();
        apply_local(&plan, &mut [&mut alice, &mut bob]);

        assert!(bob.follower.contains(&"alice".to_string()));
        assert!(alice.following.contains(&"bob".to_string()));
        assert!(bob.follow_requests.is_empty());
        assert!(alice.sent_requests.is_empty());
    }

    #[test]
    fn test_accept_cascade_scenario() {
        // alice requests bob, bob accepts: because bob does not already
        // follow alice, a fresh reciprocal request bob -> alice is
        // issued rather than a direct mutual follow.
        let mut alice = user("alice");
        let mut bob = user("bob");

        let plan = plan_send_request(&alice, &bob).unwrap();
        apply_local(&plan, &mut [&mut alice, &mut bob]);
        assert_eq!(bob.follow_requests, vec!["alice".to_string()]);

        let plan = plan_accept(&bob, &alice).unwrap();
        assert_eq!(
            plan.effects,
            vec![Effect::ReciprocalRequest {
                from: "bob".to_string(),
                to: "alice".to_string(),
            }]
        );
        apply_local(&plan, &mut [&mut alice, &mut bob]);

        // Running the reciprocal request lands bob in alice's pending set
        let plan = plan_send_request(&bob, &alice).unwrap();
        apply_local(&plan, &mut [&mut alice, &mut bob]);

        assert!(bob.follower.contains(&"alice".to_string()));
        assert!(alice.following.contains(&"bob".to_string()));
        assert!(alice.follow_requests.contains(&"bob".to_string()));
    }

    #[test]
    fn test_accept_skips_reciprocal_when_already_following() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        bob.follow_requests.push("alice".to_string());
        bob.following.push("alice".to_string());
        alice.follower.push("bob".to_string());

        let plan = plan_accept(&bob, &alice).unwrap();
        assert!(plan.effects.is_empty());
        apply_local(&plan, &mut [&mut alice, &mut bob]);
        assert!(bob.follower.contains(&"alice".to_string()));
    }

    #[test]
    fn test_reject_scenario_cleans_following_as_noop() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        bob.follow_requests.push("alice".to_string());
        alice.sent_requests.push("bob".to_string());

        let plan = plan_reject(&bob, &alice).unwrap();
        // The defensive following/follower pulls are present even though
        // alice was never followed by bob
        assert!(plan
            .updates
            .contains(&GraphUpdate::remove("bob", SetField::Following, "alice")));
        assert!(plan
            .updates
            .contains(&GraphUpdate::remove("alice", SetField::Follower, "bob")));

        apply_local(&plan, &mut [&mut alice, &mut bob]);
        assert!(bob.follow_requests.is_empty());
        assert!(alice.sent_requests.is_empty());
        assert!(bob.following.is_empty());
    }

    #[test]
    fn test_reject_without_pending_fails() {
        let alice = user("alice");
        let bob = user("bob");
        let err = plan_reject(&bob, &alice).unwrap_err();
        assert!(matches!(err, GrapevineError::NotFound(_)));
    }

    #[test]
    fn test_unfollow() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        alice.following.push("bob".to_string());
        bob.follower.push("alice".to_string());

        let plan = plan_unfollow(&alice, &bob).unwrap();
        apply_local(&plan, &mut [&mut alice, &mut bob]);
        assert!(alice.following.is_empty());
        assert!(bob.follower.is_empty());
    }

    #[test]
    fn test_unfollow_when_not_following_fails() {
        let alice = user("alice");
        let bob = user("bob");
        let err = plan_unfollow(&alice, &bob).unwrap_err();
        assert!(matches!(err, GrapevineError::InvalidRequest(_)));
    }

    #[test]
    fn test_connection_access() {
        let mut bob = user("bob");
        bob.follower.push("alice".to_string());

        assert!(check_connection_access("bob", &bob).is_ok());
        assert!(check_connection_access("alice", &bob).is_ok());
        let err = check_connection_access("carol", &bob).unwrap_err();
        assert!(matches!(err, GrapevineError::AccessDenied(_)));
    }

    #[test]
    fn test_mutual_ids_intersects_follower_sets() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        alice.follower = vec!["carol".to_string(), "dave".to_string()];
        bob.follower = vec!["dave".to_string(), "erin".to_string()];
        // carol follows only alice; dave follows both
        assert_eq!(mutual_ids(&alice, &bob), vec!["dave".to_string()]);
    }

    #[test]
    fn test_follow_status_priority() {
        let mut alice = user("alice");
        let mut bob = user("bob");

        assert_eq!(follow_status(&alice, &bob), FollowStatus::NotFollowing);

        alice.follow_requests.push("bob".to_string());
        assert_eq!(follow_status(&alice, &bob), FollowStatus::IncomingRequest);

        bob.follow_requests.push("alice".to_string());
        assert_eq!(follow_status(&alice, &bob), FollowStatus::Requested);

        alice.following.push("bob".to_string());
        bob.following.push("alice".to_string());
        assert_eq!(follow_status(&alice, &bob), FollowStatus::Connected);
    }

    #[test]
    fn test_follow_status_wire_strings() {
        assert_eq!(
            serde_json::to_value(FollowStatus::Connected).unwrap(),
            "connected"
        );
        assert_eq!(
            serde_json::to_value(FollowStatus::Requested).unwrap(),
            "Requested"
        );
        assert_eq!(
            serde_json::to_value(FollowStatus::IncomingRequest).unwrap(),
            "incoming request"
        );
        assert_eq!(
            serde_json::to_value(FollowStatus::NotFollowing).unwrap(),
            "not following"
        );
    }
}
