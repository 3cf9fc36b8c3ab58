//! Resilient gateway for the car rental platform.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                  GATEWAY                      │
//!                        │                                               │
//!    Client Request      │  ┌────────┐   ┌──────────┐   ┌───────────┐   │
//!    ────────────────────┼─▶│  http  │──▶│ breaker- │──▶│  backend  │───┼──▶ cars / rental
//!                        │  │ router │   │ guarded  │   │  clients  │   │    / payment
//!                        │  └────────┘   │  calls   │   └───────────┘   │
//!                        │        │      └────┬─────┘                   │
//!                        │        │           │ unavailable             │
//!                        │        ▼           ▼                         │
//!                        │  ┌──────────┐  ┌─────────────┐               │
//!    Degraded Response   │  │ fallback │  │ retry queue │──▶ replay     │
//!    ◀───────────────────┼──│ + cache  │  │ + workers   │    workers    │
//!                        │  └──────────┘  └─────────────┘               │
//!                        │                                               │
//!                        │  config · health monitor · observability ·    │
//!                        │  lifecycle (signals, graceful shutdown)       │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rental_gateway::config;
use rental_gateway::lifecycle::{wait_for_signal, Shutdown};
use rental_gateway::observability::{logging, metrics};
use rental_gateway::GatewayServer;

#[derive(Debug, Parser)]
#[command(name = "rental-gateway", version, about = "Resilient car rental API gateway")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply without one.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match args.config.as_deref() {
        Some(path) => config::load_config(path),
        None => config::default_config(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    logging::init(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rental-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cars = %config.backends.cars.base_url,
        rental = %config.backends.rental.base_url,
        payment = %config.backends.payment.base_url,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(address) => {
                if let Err(err) = metrics::init(address) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let signal_handle = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_handle.trigger();
    });

    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
