//! OS signal handling.
//!
//! SIGTERM and SIGINT both request a graceful shutdown. On non-unix
//! platforms only Ctrl+C is observed.

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Wait for the first termination signal and return its name.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("CTRL_C")
    }
}

/// Translate the next termination signal into a shutdown trigger.
pub async fn forward_signals(shutdown: Shutdown) {
    match wait_for_signal().await {
        Ok(name) => {
            shutdown.trigger(ShutdownReason::Signal(name));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    }
}
