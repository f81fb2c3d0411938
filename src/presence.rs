//! Presence registry
//!
//! Process-wide map from user id to the write half of that user's live
//! WebSocket connection. Entries are created only after the handshake
//! credential verifies, and the map is rebuilt empty on restart - every
//! user appears offline until they reconnect.
//!
//! `register` is last-connection-wins: a new connection for a user id
//! silently replaces the previous entry. Each connection carries a
//! uuid so that the replaced connection's eventual disconnect cannot
//! evict its successor.

use dashmap::DashMap;
use futures_util::stream::SplitSink;
use hyper_tungstenite::WebSocketStream;
use hyper_util::rt::TokioIo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use uuid::Uuid;

/// Type alias for the WebSocket write half
pub type WsSink =
    Arc<Mutex<SplitSink<WebSocketStream<TokioIo<hyper::upgrade::Upgraded>>, Message>>>;

/// The registry instantiated by the server
pub type Presence = PresenceRegistry<WsSink>;

struct PresenceEntry<S> {
    conn_id: Uuid,
    sink: S,
}

/// Thread-safe registry of live connections, indexed by user id.
///
/// Generic over the sink type so the replace/evict semantics are
/// testable without a real socket.
pub struct PresenceRegistry<S: Clone> {
    connections: DashMap<String, PresenceEntry<S>>,
    count: AtomicUsize,
    max_connections: usize,
}

impl<S: Clone> PresenceRegistry<S> {
    /// Create a new registry with the given capacity
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            count: AtomicUsize::new(0),
            max_connections,
        }
    }

    /// Check if the registry is at capacity
    pub fn is_at_capacity(&self) -> bool {
        self.count.load(Ordering::Relaxed) >= self.max_connections
    }

    /// Get the current connection count
    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Register a connection, replacing any prior entry for this user.
    /// Returns the connection id needed to unregister.
    pub fn register(&self, user_id: &str, sink: S) -> Uuid {
        let conn_id = Uuid::new_v4();
        let was_present = self
            .connections
            .insert(user_id.to_string(), PresenceEntry { conn_id, sink })
            .is_some();

        if !was_present {
            self.count.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            user = user_id,
            replaced = was_present,
            count = self.count.load(Ordering::Relaxed),
            "presence: registered"
        );
        conn_id
    }

    /// Remove a connection, but only if the entry still belongs to the
    /// disconnecting connection.
    pub fn unregister(&self, user_id: &str, conn_id: Uuid) {
        let removed = self
            .connections
            .remove_if(user_id, |_, entry| entry.conn_id == conn_id)
            .is_some();

        if removed {
            self.count.fetch_sub(1, Ordering::Relaxed);
            debug!(
                user = user_id,
                count = self.count.load(Ordering::Relaxed),
                "presence: unregistered"
            );
        }
    }

    /// Get the live connection for a user, if any. Synchronous and
    /// non-blocking.
    pub fn lookup(&self, user_id: &str) -> Option<S> {
        self.connections.get(user_id).map(|e| e.sink.clone())
    }

    /// Check if a user currently has a live connection
    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry: PresenceRegistry<u32> = PresenceRegistry::new(10);
        assert!(registry.lookup("alice").is_none());
        assert!(!registry.is_online("alice"));

        registry.register("alice", 1);
        assert_eq!(registry.lookup("alice"), Some(1));
        assert!(registry.is_online("alice"));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_register_last_connection_wins() {
        let registry: PresenceRegistry<u32> = PresenceRegistry::new(10);
        registry.register("alice", 1);
        registry.register("alice", 2);

        assert_eq!(registry.lookup("alice"), Some(2));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_stale_disconnect_does_not_evict_successor() {
        let registry: PresenceRegistry<u32> = PresenceRegistry::new(10);
        let old_conn = registry.register("alice", 1);
        let new_conn = registry.register("alice", 2);

        // Old connection's disconnect fires after the replacement
        registry.unregister("alice", old_conn);
        assert_eq!(registry.lookup("alice"), Some(2));
        assert_eq!(registry.connection_count(), 1);

        registry.unregister("alice", new_conn);
        assert!(registry.lookup("alice").is_none());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_capacity() {
        let registry: PresenceRegistry<u32> = PresenceRegistry::new(2);
        assert!(!registry.is_at_capacity());
        registry.register("alice", 1);
        registry.register("bob", 2);
        assert!(registry.is_at_capacity());
    }
}
