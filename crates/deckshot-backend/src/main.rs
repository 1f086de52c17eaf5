//! Deckshot plugin backend - owns the Deckshot daemon process
//!
//! Answers the panel's method calls over WebSocket and exposes a small
//! read-only HTTP API. Starts the daemon on launch when the configuration
//! enables it and stops it on shutdown.

mod config;
mod error;
mod rpc;
mod state;
mod supervisor;
mod ws;

use anyhow::{Context, Result};
use clap::Parser;
use config::DaemonConfigFile;
use deckshot_protocol::DEFAULT_BACKEND_ADDR;
use state::BackendState;
use std::path::PathBuf;
use std::sync::Arc;
use supervisor::Supervisor;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "deckshot-backend", about = "Deckshot plugin backend")]
struct Cli {
    /// Listen address
    #[arg(long, default_value = DEFAULT_BACKEND_ADDR)]
    listen: String,

    /// Deckshot configuration file (defaults to ~/.config/deckshot/deckshot.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deckshot daemon binary
    #[arg(long, default_value = "deckshot")]
    daemon_bin: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => DaemonConfigFile::default_path().context("Failed to determine config directory")?,
    };
    let config = DaemonConfigFile::new(config_path);
    if config.ensure_exists().context("Failed to prepare configuration file")? {
        info!("Wrote default configuration to {}", config.path().display());
    }

    let mut supervisor = Supervisor::new(cli.daemon_bin, config);
    info!("Supervising {}", supervisor.daemon_bin().display());
    if let Err(e) = supervisor.start_if_enabled() {
        error!("Failed to start deckshot: {}", e);
    }

    let state = Arc::new(BackendState::new(supervisor));

    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/api/status", axum::routing::get(rpc::get_status))
        .route("/api/config", axum::routing::get(rpc::get_config))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.listen))?;
    info!("Listening on {}", cli.listen);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    if let Err(e) = state.supervisor.lock().await.stop().await {
        error!("Failed to stop deckshot: {}", e);
    }

    Ok(())
}
