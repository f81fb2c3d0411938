//! Notification fan-out engine
//!
//! Persist first, then best-effort live push. A notification exists
//! once its record is inserted, regardless of delivery outcome: an
//! offline recipient discovers it on next connect via the unread dump,
//! or by polling. No idempotency, no dedup, no retry - triggering the
//! engine twice for one action creates two records, and a persistence
//! failure is reported to the caller who decides whether to swallow it.

use bson::{doc, DateTime, Document};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::schemas::{
    Metadata, NotificationDoc, NotificationKind, NOTIFICATION_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::error::{GrapevineError, Result};
use crate::events::{self, ServerEvent, ShorthandPush};
use crate::presence::{Presence, PresenceRegistry};

/// What happened, carrying only the fields relevant to its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Like { from: String, post_id: String },
    Comment { from: String, post_id: String, comment_id: String },
    Mention { from: String, post_id: String },
    Message { from: String },
    FollowRequest { from: String },
    Suggestion { message: String },
}

impl NotificationEvent {
    /// Stored notification kind for this event
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::Like { .. } => NotificationKind::Like,
            NotificationEvent::Comment { .. } => NotificationKind::Comment,
            NotificationEvent::Mention { .. } => NotificationKind::Mention,
            NotificationEvent::Message { .. } => NotificationKind::Message,
            NotificationEvent::FollowRequest { .. } => NotificationKind::FollowRequest,
            NotificationEvent::Suggestion { .. } => NotificationKind::Suggestion,
        }
    }

    /// The like/comment path additionally fires the lightweight
    /// `notification` shorthand push
    pub fn wants_shorthand(&self) -> bool {
        matches!(
            self,
            NotificationEvent::Like { .. } | NotificationEvent::Comment { .. }
        )
    }

    /// Originating user id, when the kind has one
    pub fn from(&self) -> Option<&str> {
        match self {
            NotificationEvent::Like { from, .. }
            | NotificationEvent::Comment { from, .. }
            | NotificationEvent::Mention { from, .. }
            | NotificationEvent::Message { from }
            | NotificationEvent::FollowRequest { from } => Some(from),
            NotificationEvent::Suggestion { .. } => None,
        }
    }

    /// Build the sparse record for `recipient`
    fn into_doc(self, recipient: &str) -> NotificationDoc {
        let kind = self.kind();
        let (from, post_id, comment_id, message) = match self {
            NotificationEvent::Like { from, post_id } => (Some(from), Some(post_id), None, None),
            NotificationEvent::Comment {
                from,
                post_id,
                comment_id,
            } => (Some(from), Some(post_id), Some(comment_id), None),
            NotificationEvent::Mention { from, post_id } => (Some(from), Some(post_id), None, None),
            NotificationEvent::Message { from } => (Some(from), None, None, None),
            NotificationEvent::FollowRequest { from } => (Some(from), None, None, None),
            NotificationEvent::Suggestion { message } => (None, None, None, Some(message)),
        };

        NotificationDoc {
            _id: None,
            metadata: Metadata::default(),
            notification_id: Uuid::new_v4().to_string(),
            user: recipient.to_string(),
            kind,
            from,
            post_id,
            comment_id,
            message,
            read: false,
            created_at: DateTime::now(),
        }
    }
}

/// The events pushed live for a just-persisted record, in push order:
/// the full record, then the like/comment shorthand when requested.
fn live_events(record: &NotificationDoc, shorthand_from: Option<String>) -> Vec<ServerEvent> {
    let mut events = vec![ServerEvent::NewNotification(record.view())];
    if let Some(from) = shorthand_from {
        events.push(ServerEvent::Notification(ShorthandPush {
            kind: record.kind.as_str(),
            from,
            timestamp: record.created_at.timestamp_millis(),
        }));
    }
    events
}

/// Decide live delivery for a persisted record: the recipient's sink and
/// the events to push, or `None` when the recipient has no registered
/// connection. Persistence has already happened by the time this runs.
fn plan_delivery<S: Clone>(
    presence: &PresenceRegistry<S>,
    recipient: &str,
    record: &NotificationDoc,
    shorthand_from: Option<String>,
) -> Option<(S, Vec<ServerEvent>)> {
    let sink = presence.lookup(recipient)?;
    Some((sink, live_events(record, shorthand_from)))
}

/// Filter for the mark-read update: the record must belong to the
/// calling user, so one user cannot flip another's notification.
fn mark_read_filter(user_id: &str, notification_id: &str) -> Document {
    doc! { "user": user_id, "notification_id": notification_id }
}

/// Persists notification records and pushes them live when the
/// recipient has a registered connection
pub struct NotificationService {
    notifications: MongoCollection<NotificationDoc>,
    presence: Arc<Presence>,
}

impl NotificationService {
    pub async fn new(client: &MongoClient, presence: Arc<Presence>) -> Result<Self> {
        Ok(Self {
            notifications: client.collection(NOTIFICATION_COLLECTION).await?,
            presence,
        })
    }

    /// Persist a notification and best-effort push it live.
    ///
    /// Persistence is the durability boundary and happens
    /// unconditionally; the presence lookup and push never fail the
    /// operation.
    pub async fn trigger(
        &self,
        recipient: &str,
        event: NotificationEvent,
    ) -> Result<NotificationDoc> {
        let shorthand_from = if event.wants_shorthand() {
            event.from().map(str::to_string)
        } else {
            None
        };
        let record = event.into_doc(recipient);

        self.notifications.insert_one(record.clone()).await?;

        if let Some((sink, pushes)) = plan_delivery(&self.presence, recipient, &record, shorthand_from)
        {
            for push in &pushes {
                if !events::push(&sink, push).await {
                    debug!(user = recipient, "live push failed, record persisted");
                }
            }
        }

        Ok(record)
    }

    /// Trigger where the primary action must not observe a fan-out
    /// failure: errors are logged and swallowed.
    pub async fn trigger_detached(&self, recipient: &str, event: NotificationEvent) {
        if let Err(e) = self.trigger(recipient, event).await {
            warn!(user = recipient, "notification fan-out failed: {}", e);
        }
    }

    /// Unread notifications for a user, newest first
    pub async fn unread(&self, user_id: &str) -> Result<Vec<NotificationDoc>> {
        self.notifications
            .find_sorted(
                doc! { "user": user_id, "read": false },
                doc! { "created_at": -1 },
                None,
            )
            .await
    }

    /// Mark one of `user_id`'s notifications read by id
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        let result = self
            .notifications
            .update_one(
                mark_read_filter(user_id, notification_id),
                doc! { "$set": { "read": true } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(GrapevineError::NotFound(format!(
                "notification {}",
                notification_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            NotificationEvent::FollowRequest {
                from: "alice".to_string()
            }
            .kind(),
            NotificationKind::FollowRequest
        );
        assert_eq!(
            NotificationEvent::Suggestion {
                message: "follow bob".to_string()
            }
            .kind(),
            NotificationKind::Suggestion
        );
    }

    #[test]
    fn test_shorthand_only_for_like_and_comment() {
        assert!(NotificationEvent::Like {
            from: "a".to_string(),
            post_id: "p".to_string()
        }
        .wants_shorthand());
        assert!(NotificationEvent::Comment {
            from: "a".to_string(),
            post_id: "p".to_string(),
            comment_id: "c".to_string()
        }
        .wants_shorthand());
        assert!(!NotificationEvent::Message {
            from: "a".to_string()
        }
        .wants_shorthand());
        assert!(!NotificationEvent::FollowRequest {
            from: "a".to_string()
        }
        .wants_shorthand());
    }

    #[test]
    fn test_into_doc_builds_sparse_record() {
        let doc = NotificationEvent::Comment {
            from: "alice".to_string(),
            post_id: "p-1".to_string(),
            comment_id: "c-1".to_string(),
        }
        .into_doc("bob");

        assert_eq!(doc.user, "bob");
        assert_eq!(doc.kind, NotificationKind::Comment);
        assert_eq!(doc.from.as_deref(), Some("alice"));
        assert_eq!(doc.post_id.as_deref(), Some("p-1"));
        assert_eq!(doc.comment_id.as_deref(), Some("c-1"));
        assert!(doc.message.is_none());
        assert!(!doc.read);
        assert!(!doc.notification_id.is_empty());
    }

    #[test]
    fn test_into_doc_message_has_no_post_reference() {
        let doc = NotificationEvent::Message {
            from: "alice".to_string(),
        }
        .into_doc("bob");
        assert!(doc.post_id.is_none());
        assert!(doc.comment_id.is_none());
        assert_eq!(doc.from.as_deref(), Some("alice"));
    }

    #[test]
    fn test_no_push_when_recipient_unregistered() {
        let presence: PresenceRegistry<u32> = PresenceRegistry::new(8);
        let record = NotificationEvent::FollowRequest {
            from: "alice".to_string(),
        }
        .into_doc("bob");

        assert!(plan_delivery(&presence, "bob", &record, None).is_none());
    }

    #[test]
    fn test_single_push_for_registered_recipient() {
        let presence: PresenceRegistry<u32> = PresenceRegistry::new(8);
        presence.register("bob", 7);
        let record = NotificationEvent::FollowRequest {
            from: "alice".to_string(),
        }
        .into_doc("bob");

        let (sink, pushes) = plan_delivery(&presence, "bob", &record, None).unwrap();
        assert_eq!(sink, 7);
        assert_eq!(pushes.len(), 1);
        assert!(matches!(pushes[0], ServerEvent::NewNotification(_)));
    }

    #[test]
    fn test_like_path_pushes_shorthand_second() {
        let presence: PresenceRegistry<u32> = PresenceRegistry::new(8);
        presence.register("bob", 1);

        let event = NotificationEvent::Like {
            from: "alice".to_string(),
            post_id: "p-1".to_string(),
        };
        assert!(event.wants_shorthand());
        let shorthand_from = event.from().map(str::to_string);
        let record = event.into_doc("bob");

        let (_, pushes) = plan_delivery(&presence, "bob", &record, shorthand_from).unwrap();
        assert_eq!(pushes.len(), 2);
        assert!(matches!(pushes[0], ServerEvent::NewNotification(_)));
        match &pushes[1] {
            ServerEvent::Notification(push) => {
                assert_eq!(push.kind, "like");
                assert_eq!(push.from, "alice");
                assert_eq!(push.timestamp, record.created_at.timestamp_millis());
            }
            other => panic!("expected shorthand push, got {:?}", other),
        }
    }

    #[test]
    fn test_mark_read_filter_scoped_to_recipient() {
        assert_eq!(
            mark_read_filter("bob", "n-1"),
            doc! { "user": "bob", "notification_id": "n-1" }
        );
    }

    #[test]
    fn test_distinct_ids_per_trigger() {
        let a = NotificationEvent::Message {
            from: "alice".to_string(),
        }
        .into_doc("bob");
        let b = NotificationEvent::Message {
            from: "alice".to_string(),
        }
        .into_doc("bob");
        assert_ne!(a.notification_id, b.notification_id);
    }
}
