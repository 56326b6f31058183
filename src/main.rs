//! Edge gateway (v1)
//!
//! A CORS-aware reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                   EDGE GATEWAY                    │
//!                     │                                                   │
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌─────────────┐  │
//!   ──────────────────┼─▶│ request  │──▶│   edge    │──▶│    proxy    │──┼──▶ Upstream
//!                     │  │ id/trace │   │ middleware│   │   handler   │  │    (WORKER_URL)
//!                     │  └──────────┘   └─────┬─────┘   └──────┬──────┘  │
//!                     │                       │ OPTIONS → 204  │         │
//!   Client Response   │                       ▼                ▼         │
//!   ◀─────────────────┼─────────────── CORS / security ◀── relay + CORS ◀┼─── Response
//!                     │                                                   │
//!                     │  config · observability · lifecycle · resilience  │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::loader::{finalize, read_config};
use edge_gateway::config::GatewayConfig;
use edge_gateway::lifecycle::signals::shutdown_on_signal;
use edge_gateway::observability::{logging, metrics};
use edge_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "CORS-aware edge gateway forwarding /api to a single upstream", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream base URL, overriding the config file.
    #[arg(long, env = "WORKER_URL")]
    worker_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_overrides(args.bind, args.worker_url);
    let config = finalize(config)?;

    logging::init_logging(&config.observability);

    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_prefix = %config.upstream.api_prefix,
        timeout_ms = config.upstream.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
