//! ZEUS SAFETY API proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser request
//!     ──────────────▶ http::server (request ID, trace, timeout)
//!                          │
//!                          ▼
//!                     http::handler ──▶ routing::registry (path → resource)
//!                          │            security::auth (bearer policy)
//!                          │            routing::target (backend URL + query)
//!                          ▼
//!                     upstream::client ──────────────────────────▶ Backend
//!                          │
//!                          ▼
//!     ◀────────────── upstream::envelope (normalize JSON / text / errors)
//!
//!     config::watcher ──▶ AppState::reload (hot swap of the resource table)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use zeus_proxy::config::loader::{apply_env_overrides, load_config};
use zeus_proxy::config::watcher::ConfigWatcher;
use zeus_proxy::lifecycle::spawn_signal_listener;
use zeus_proxy::observability::{logging, metrics};
use zeus_proxy::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser)]
#[command(name = "zeus-proxy", version)]
#[command(about = "API proxy for the ZEUS SAFETY front end", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Watched for changes.
    #[arg(short, long, env = "ZEUS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = ProxyConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "zeus-proxy starting");

    if args.config.is_none() {
        tracing::warn!("No configuration file given, serving without resources");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        resources = config.resources.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    // The watcher handle has to outlive the server.
    let (_watcher, updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config)?;
    server
        .run(listener, updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
