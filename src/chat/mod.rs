//! Messaging gate
//!
//! Direct messages require a mutual follow in both directions. Once
//! authorized, the message is persisted unconditionally, echoed back to
//! the sender's own connection, and pushed live to the recipient - or
//! routed through the notification fan-out engine when the recipient is
//! offline.

use bson::{doc, DateTime};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::schemas::{MessageDoc, Metadata, UserDoc, MESSAGE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::error::{GrapevineError, Result};
use crate::events::{self, ServerEvent};
use crate::graph::GraphStore;
use crate::notify::{NotificationEvent, NotificationService};
use crate::presence::Presence;

/// The mutual-follow precondition for messaging between two users
pub fn check_mutual_follow(sender: &UserDoc, recipient: &UserDoc) -> Result<()> {
    if sender.is_following(&recipient.user_id) && recipient.is_following(&sender.user_id) {
        Ok(())
    } else {
        Err(GrapevineError::AccessDenied(
            "messaging requires a mutual follow".to_string(),
        ))
    }
}

/// Authorizes and delivers direct messages
#[derive(Clone)]
pub struct MessageService {
    messages: MongoCollection<MessageDoc>,
    graph: GraphStore,
    presence: Arc<Presence>,
    notify: Arc<NotificationService>,
}

impl MessageService {
    pub async fn new(
        client: &MongoClient,
        graph: GraphStore,
        presence: Arc<Presence>,
        notify: Arc<NotificationService>,
    ) -> Result<Self> {
        Ok(Self {
            messages: client.collection(MESSAGE_COLLECTION).await?,
            graph,
            presence,
            notify,
        })
    }

    /// Authorize, persist, echo, and deliver a direct message.
    pub async fn send_message(&self, sender_id: &str, to: &str, text: &str) -> Result<MessageDoc> {
        let sender = self.graph.get_user(sender_id).await?;
        let recipient = self.graph.get_user(to).await?;
        check_mutual_follow(&sender, &recipient)?;

        let record = MessageDoc {
            _id: None,
            metadata: Metadata::default(),
            message_id: Uuid::new_v4().to_string(),
            from: sender_id.to_string(),
            to: to.to_string(),
            text: text.to_string(),
            created_at: DateTime::now(),
        };
        self.messages.insert_one(record.clone()).await?;

        // Echo to the sender's own connection
        if let Some(sink) = self.presence.lookup(sender_id) {
            events::push(&sink, &ServerEvent::MessageSent(record.view())).await;
        }

        // Live push, or store-only delivery via notification
        if let Some(sink) = self.presence.lookup(to) {
            events::push(&sink, &ServerEvent::ReceiveMessage(record.view())).await;
        } else {
            debug!(to = to, "recipient offline, routing to notification");
            self.notify
                .trigger_detached(
                    to,
                    NotificationEvent::Message {
                        from: sender_id.to_string(),
                    },
                )
                .await;
        }

        info!(from = sender_id, to = to, "message delivered");
        Ok(record)
    }

    /// Stored messages between the pair, oldest first. Re-validates the
    /// mutual-follow precondition before returning anything.
    pub async fn chat_history(&self, user_id: &str, partner_id: &str) -> Result<Vec<MessageDoc>> {
        let user = self.graph.get_user(user_id).await?;
        let partner = self.graph.get_user(partner_id).await?;
        check_mutual_follow(&user, &partner)?;

        self.messages
            .find_sorted(
                doc! {
                    "$or": [
                        { "from": user_id, "to": partner_id },
                        { "from": partner_id, "to": user_id },
                    ]
                },
                doc! { "created_at": 1 },
                None,
            )
            .await
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

    #[test]
    fn test_mutual_follow_required_both_directions() {
        let mut alice = user("alice");
        let mut bob = user("bob");

        assert!(check_mutual_follow(&alice, &bob).is_err());

        alice.following.push("bob".to_string());
        assert!(check_mutual_follow(&alice, &bob).is_err());

        bob.following.push("alice".to_string());
        assert!(check_mutual_follow(&alice, &bob).is_ok());
    }

    #[test]
    fn test_one_directional_follow_denied() {
        let alice = user("alice");
        let mut bob = user("bob");
        bob.following.push("alice".to_string());

        let err = check_mutual_follow(&alice, &bob).unwrap_err();
        assert!(matches!(err, GrapevineError::AccessDenied(_)));
    }
}
