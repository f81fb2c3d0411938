//! Grapevine - social graph and real-time delivery service

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grapevine::{config::Args, server::AppState, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("grapevine={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Grapevine - social graph service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Max clients: {}", args.max_clients);
    info!("======================================");

    let state = match AppState::init(args).await {
        Ok(s) => {
            info!("MongoDB connected successfully");
            s
        }
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
