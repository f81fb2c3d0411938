//! Grapevine - social graph and real-time event delivery
//!
//! Grapevine is the consistency core of a social-networking application:
//! it owns the follow-relationship state machine, decides between live
//! and deferred notification delivery, and gates direct messages behind
//! mutual follows.
//!
//! ## Services
//!
//! - **Graph**: follow request / accept / reject / unfollow workflow over
//!   the per-user relationship sets stored in MongoDB
//! - **Presence**: in-memory registry of live WebSocket connections
//! - **Notify**: persist-then-push notification fan-out engine
//! - **Chat**: mutual-follow-gated direct messaging with offline fallback
//! - **Ranking**: engagement-decay popularity scoring for post feeds

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod graph;
pub mod notify;
pub mod presence;
pub mod ranking;
pub mod routes;
pub mod server;

pub use config::Args;
pub use error::{GrapevineError, Result};
pub use server::AppState;
