//! HTTP and WebSocket server

pub mod http;
pub mod ws;

pub use http::{run, AppState};
