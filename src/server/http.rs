//! HTTP server implementation
//!
//! hyper http1 with TokioIo, hand-routed dispatch. REST calls carry a
//! bearer token; the WebSocket endpoint authenticates during upgrade.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::auth::{extract_token_from_header, extract_token_from_query, Claims, JwtValidator};
use crate::chat::MessageService;
use crate::config::Args;
use crate::db::MongoClient;
use crate::error::{GrapevineError, Result};
use crate::graph::{FollowWorkflow, GraphStore};
use crate::notify::NotificationService;
use crate::presence::Presence;
use crate::ranking::PostService;
use crate::routes;
use crate::server::ws;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    pub mongo: MongoClient,
    pub presence: Arc<Presence>,
    pub workflow: FollowWorkflow,
    pub notify: Arc<NotificationService>,
    pub chat: MessageService,
    pub posts: PostService,
}

impl AppState {
    /// Connect to MongoDB and wire up the services
    pub async fn init(args: Args) -> Result<Arc<Self>> {
        let jwt = JwtValidator::new(&args.effective_jwt_secret());
        let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
        let presence = Arc::new(Presence::new(args.max_clients));

        let graph = GraphStore::new(&mongo).await?;
        let notify = Arc::new(NotificationService::new(&mongo, Arc::clone(&presence)).await?);
        let workflow = FollowWorkflow::new(graph.clone(), Arc::clone(&notify));
        let chat = MessageService::new(
            &mongo,
            graph,
            Arc::clone(&presence),
            Arc::clone(&notify),
        )
        .await?;
        let posts = PostService::new(&mongo).await?;

        Ok(Arc::new(Self {
            args,
            jwt,
            mongo,
            presence,
            workflow,
            notify,
            chat,
            posts,
        }))
    }
}

/// Run the accept loop
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Listening on {}", state.args.listen);
    info!(
        "WebSocket endpoint at /ws (max {} clients)",
        state.args.max_clients
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    debug!("[{}] {} {}", addr, method, path);

    // WebSocket endpoint - authenticates during the upgrade handshake
    if method == Method::GET && path == "/ws" {
        if hyper_tungstenite::is_upgrade_request(&req) {
            return Ok(ws::handle_upgrade(state, req).await);
        }
        return Ok(bad_request_response("WebSocket upgrade required for /ws"));
    }

    // Unauthenticated probes
    match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check(&state));
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            return Ok(routes::readiness_check(&state).await);
        }
        (&Method::GET, "/version") => return Ok(routes::version_info()),
        (&Method::OPTIONS, _) => return Ok(preflight_response()),
        _ => {}
    }

    // Everything below requires a verified identity
    let claims = match authenticate(&state, &req) {
        Ok(c) => c,
        Err(e) => return Ok(routes::error_response(&e)),
    };

    let response = match (&method, path.as_str()) {
        (&Method::POST, p) if p.starts_with("/api/v1/follow/request/") => {
            match routes::path_segment(p, "/api/v1/follow/request/") {
                Some(target) => routes::handle_follow_request(&state, &claims, target).await,
                None => not_found_response(p),
            }
        }
        (&Method::POST, p) if p.starts_with("/api/v1/follow/accept/") => {
            match routes::path_segment(p, "/api/v1/follow/accept/") {
                Some(from) => routes::handle_follow_accept(&state, &claims, from).await,
                None => not_found_response(p),
            }
        }
        (&Method::POST, p) if p.starts_with("/api/v1/follow/reject/") => {
            match routes::path_segment(p, "/api/v1/follow/reject/") {
                Some(from) => routes::handle_follow_reject(&state, &claims, from).await,
                None => not_found_response(p),
            }
        }
        (&Method::POST, p) if p.starts_with("/api/v1/follow/unfollow/") => {
            match routes::path_segment(p, "/api/v1/follow/unfollow/") {
                Some(target) => routes::handle_unfollow(&state, &claims, target).await,
                None => not_found_response(p),
            }
        }
        (&Method::GET, "/api/v1/follow/requests") => {
            routes::handle_incoming_requests(&state, &claims).await
        }
        (&Method::GET, p) if p.starts_with("/api/v1/follow/status/") => {
            match routes::path_segment(p, "/api/v1/follow/status/") {
                Some(target) => routes::handle_follow_status(&state, &claims, target).await,
                None => not_found_response(p),
            }
        }
        (&Method::GET, p) if p.starts_with("/api/v1/users/") => {
            match routes::parse_user_route(p) {
                Some((target, "followers")) => {
                    routes::handle_followers(&state, &claims, target).await
                }
                Some((target, "following")) => {
                    routes::handle_following(&state, &claims, target).await
                }
                Some((target, "mutuals")) => routes::handle_mutuals(&state, &claims, target).await,
                _ => not_found_response(p),
            }
        }
        (&Method::GET, "/api/v1/notifications/unread") => {
            routes::handle_unread_notifications(&state, &claims).await
        }
        (&Method::POST, p) if p.starts_with("/api/v1/notifications/") && p.ends_with("/read") => {
            match notification_read_id(p) {
                Some(id) => routes::handle_mark_notification_read(&state, &claims, id).await,
                None => not_found_response(p),
            }
        }
        (&Method::GET, "/api/v1/posts/popular") => {
            routes::handle_popular_posts(&state, query.as_deref()).await
        }
        (&Method::GET, "/api/v1/posts/recent") => {
            routes::handle_recent_posts(&state, query.as_deref()).await
        }
        (&Method::GET, p) if p.starts_with("/api/v1/messages/") => {
            match routes::path_segment(p, "/api/v1/messages/") {
                Some(partner) => routes::handle_chat_history(&state, &claims, partner).await,
                None => not_found_response(p),
            }
        }
        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Verify the bearer credential on a REST request
fn authenticate(state: &AppState, req: &Request<Incoming>) -> Result<Claims> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if let Some(token) = extract_token_from_header(header) {
        return state.jwt.verify(token);
    }

    if let Some(token) = extract_token_from_query(req.uri().query()) {
        return state.jwt.verify(&token);
    }

    Err(GrapevineError::Auth("missing bearer token".to_string()))
}

/// Extract the id from `/api/v1/notifications/{id}/read`
fn notification_read_id(path: &str) -> Option<&str> {
    let id = path
        .strip_prefix("/api/v1/notifications/")?
        .strip_suffix("/read")?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(format!(
            r#"{{"error":"not found: {}"}}"#,
            path
        ))))
        .unwrap()
}

fn bad_request_response(msg: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(format!(r#"{{"error":"{}"}}"#, msg))))
        .unwrap()
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Authorization, Content-Type")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_read_id() {
        assert_eq!(
            notification_read_id("/api/v1/notifications/n-1/read"),
            Some("n-1")
        );
        assert_eq!(notification_read_id("/api/v1/notifications//read"), None);
        assert_eq!(
            notification_read_id("/api/v1/notifications/a/b/read"),
            None
        );
        assert_eq!(notification_read_id("/api/v1/notifications/n-1"), None);
    }
}
