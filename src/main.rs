//! Scale-to-zero service (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  SERVICE                      │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!   ──────────────────┼─▶│  axum    │──▶│ inactivity │──▶│handlers │  │
//!                     │  │  server  │   │  watchdog  │   │ + store │  │
//!                     │  └────▲─────┘   └─────┬──────┘   └─────────┘  │
//!                     │       │ drain         │ on_inactive           │
//!                     │  ┌────┴───────────────▼──────┐                │
//!                     │  │   lifecycle / shutdown    │◀── SIGTERM     │
//!                     │  └───────────────────────────┘                │
//!                     └──────────────────────────────────────────────┘
//! ```
//!
//! The process exits after `inactivity.timeout_secs` without requests so the
//! platform can scale the machine to zero; the next request starts it again.

use std::path::PathBuf;

use clap::Parser;

use scale_to_zero::config::{self, ServiceConfig};
use scale_to_zero::lifecycle;
use scale_to_zero::observability::logging;

#[derive(Parser)]
#[command(name = "scale-to-zero")]
#[command(about = "Item service that shuts down when idle", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config: ServiceConfig = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        inactivity_enabled = config.inactivity.enabled,
        inactivity_timeout_secs = config.inactivity.timeout_secs,
        region = %config.service.region,
        "Configuration loaded"
    );

    let reason = lifecycle::run(config).await?;
    tracing::info!(reason = ?reason, "Exiting");
    Ok(())
}
