//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics and bind the listener
//! - Arm the inactivity watchdog, wired to the shutdown coordinator
//! - Run the HTTP server until shutdown, bounded by the grace period
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds before the watchdog arms, so the idle clock starts when traffic can arrive

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::inactivity::{Watchdog, WatchdogError};
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::storage::ItemStore;

/// Fatal errors while starting or running the service.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("inactivity watchdog: {0}")]
    Watchdog(#[from] WatchdogError),

    #[error("server task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run the service with a fresh shutdown coordinator listening for OS signals.
pub async fn run(config: ServiceConfig) -> Result<Option<ShutdownReason>, StartupError> {
    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_signals(shutdown.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    serve(config, listener, shutdown).await
}

/// Run the service on an already bound listener until `shutdown` fires.
///
/// Returns the reason the service stopped, or `None` if the server exited on its own.
pub async fn serve(
    config: ServiceConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<Option<ShutdownReason>, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let watchdog = if config.inactivity.enabled {
        let trigger = shutdown.clone();
        Some(Watchdog::new(config.inactivity.timeout(), move || {
            trigger.trigger(ShutdownReason::Inactivity);
        })?)
    } else {
        tracing::info!("Inactivity shutdown disabled");
        None
    };

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let server = HttpServer::new(config, ItemStore::new(), watchdog.clone());
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let reason = tokio::select! {
        result = &mut serving => {
            if let Some(watchdog) = &watchdog {
                watchdog.stop();
            }
            result??;
            return Ok(shutdown.reason());
        }
        reason = shutdown.subscribe().wait() => reason,
    };

    // Whatever triggered shutdown, the watchdog must not fire during the drain.
    if let Some(watchdog) = &watchdog {
        watchdog.stop();
    }

    match tokio::time::timeout(grace, &mut serving).await {
        Ok(result) => result??,
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Graceful shutdown deadline elapsed, dropping open connections"
            );
            serving.abort();
        }
    }

    tracing::info!(reason = ?reason, "Shutdown complete");
    Ok(reason)
}
