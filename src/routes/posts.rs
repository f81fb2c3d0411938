//! Post feed routes
//!
//! - `GET /api/v1/posts/popular?limit=`
//! - `GET /api/v1/posts/recent?limit=`
//! - `GET /api/v1/messages/{partner}` (chat history)

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;

use crate::auth::Claims;
use crate::db::schemas::MessageView;
use crate::routes::{error_response, json_response, parse_limit};
use crate::server::AppState;

pub async fn handle_popular_posts(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let limit = state.args.clamp_feed_limit(parse_limit(query));
    match state.posts.popular(limit).await {
        Ok(posts) => json_response(&posts),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_recent_posts(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let limit = state.args.clamp_feed_limit(parse_limit(query));
    match state.posts.recent(limit).await {
        Ok(posts) => json_response(&posts),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_chat_history(
    state: &AppState,
    claims: &Claims,
    partner: &str,
) -> Response<Full<Bytes>> {
    match state.chat.chat_history(&claims.sub, partner).await {
        Ok(records) => {
            let views: Vec<MessageView> = records.iter().map(|r| r.view()).collect();
            json_response(&views)
        }
        Err(e) => error_response(&e),
    }
}
