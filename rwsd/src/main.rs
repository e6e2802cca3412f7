//! Repository Webhook Synchronizer - daemon
//!
//! The daemon tracks a set of local working copies, receives webhook
//! notifications from their remote hosts, and runs the update command
//! against the matching directory.

#![forbid(unsafe_code)]

mod executor;
mod handler;
mod http_api;
mod locks;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rws_common::Config;

use executor::SyncExecutor;
use handler::AppState;
use locks::DirLocks;

#[derive(Parser)]
#[command(name = "rwsd")]
#[command(author, version, about = "RWS daemon - webhook-driven repository synchronization")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "RWS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address override (e.g. 127.0.0.1:9000)
    #[arg(short, long)]
    listen: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Starting RWS daemon...");

    // Load configuration and build the immutable registry
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let registry = config.registry().context("invalid repository registry")?;
    info!("Tracking {} repositories", registry.len());
    for entry in registry.entries() {
        info!(
            "Tracking repository: {} -> {} (override token: {})",
            entry.url,
            entry.directory.display(),
            entry.token.is_some()
        );
    }

    let executor =
        SyncExecutor::from_config(&config.sync).context("invalid sync configuration")?;

    let state = AppState {
        registry,
        default_token: config.auth.default_token.clone(),
        executor,
        locks: DirLocks::new(),
    };

    let listen = cli.listen.unwrap_or_else(|| config.server.listen.clone());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, http_api::create_router(state))
        .await
        .context("HTTP server terminated")?;

    Ok(())
}
