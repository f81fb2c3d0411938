//! Configuration for grapevine
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Grapevine - social graph and real-time event delivery service
#[derive(Parser, Debug, Clone)]
#[command(name = "grapevine")]
#[command(about = "Social graph and real-time event delivery service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "grapevine")]
    pub mongodb_db: String,

    /// Enable development mode (insecure default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum concurrent WebSocket connections
    #[arg(long, env = "MAX_CLIENTS", default_value = "32768")]
    pub max_clients: usize,

    /// Default number of posts returned by the feed endpoints
    #[arg(long, env = "FEED_LIMIT", default_value = "20")]
    pub feed_limit: usize,

    /// Hard cap on the number of posts a feed request may ask for
    #[arg(long, env = "FEED_LIMIT_MAX", default_value = "100")]
    pub feed_limit_max: usize,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn effective_jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Clamp a client-requested feed limit to the configured bounds.
    pub fn clamp_feed_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.feed_limit).min(self.feed_limit_max)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.max_clients == 0 {
            return Err("MAX_CLIENTS must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["grapevine"])
    }

    #[test]
    fn test_validate_requires_secret_in_production() {
        let args = base_args();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_dev_mode_allows_missing_secret() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
        assert_eq!(args.effective_jwt_secret(), "dev-only-insecure-secret");
    }

    #[test]
    fn test_clamp_feed_limit() {
        let args = base_args();
        assert_eq!(args.clamp_feed_limit(None), 20);
        assert_eq!(args.clamp_feed_limit(Some(50)), 50);
        assert_eq!(args.clamp_feed_limit(Some(5000)), 100);
    }
}
