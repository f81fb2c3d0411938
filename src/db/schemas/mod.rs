//! Document schemas
//!
//! One module per collection. Every document embeds the shared
//! [`Metadata`] block stamped by the collection wrapper.

pub mod message;
pub mod metadata;
pub mod notification;
pub mod post;
pub mod user;

pub use message::{MessageDoc, MessageView, MESSAGE_COLLECTION};
pub use metadata::Metadata;
pub use notification::{
    NotificationDoc, NotificationKind, NotificationView, NOTIFICATION_COLLECTION,
};
pub use post::{CommentEntry, PostDoc, POST_COLLECTION};
pub use user::{ProfileView, UserDoc, USER_COLLECTION};
