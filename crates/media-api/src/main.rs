//! Movies & Anime API server application.

use anyhow::{Context, Result};
use clap::Parser;
use media_api::{create_router, AppState};
use shared::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging (overrides the configured level)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.level()
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.logging.log_dir.clone(),
        component: "media-api".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Movies & Anime API starting");
    info!(config_file = %args.config.display(), "Loaded configuration");
    info!(
        ttl_seconds = config.cache.ttl_seconds,
        max_entries = config.cache.max_entries,
        "Cache configured"
    );

    let bind_addr = config.bind_addr();

    // Build shared state and router
    let state = Arc::new(AppState::new(config).context("Failed to build application state")?);
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!(addr = %bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
