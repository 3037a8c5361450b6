//! Shutdown coordination for the service.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Why shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal arrived (e.g. "SIGTERM").
    Signal(&'static str),
    /// The inactivity watchdog fired.
    Inactivity,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {}", name),
            ShutdownReason::Inactivity => write!(f, "inactivity"),
        }
    }
}

/// Coordinator for graceful shutdown.
///
/// Backed by a watch channel, so listeners subscribed after the trigger
/// still observe it. Clones share the same channel.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown. Only the first reason is kept; returns whether this call won.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::info!(reason = %reason, "Shutdown triggered");
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Get the number of active listeners.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`].
pub struct ShutdownListener {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered, returning the reason.
    ///
    /// Also resolves (with `None`) if every coordinator handle was dropped.
    pub async fn wait(mut self) -> Option<ShutdownReason> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        assert!(shutdown.trigger(ShutdownReason::Inactivity));

        let reason = shutdown.subscribe().wait().await;
        assert_eq!(reason, Some(ShutdownReason::Inactivity));
    }

    #[tokio::test]
    async fn test_first_reason_wins() {
        let shutdown = Shutdown::new();
        let listener = shutdown.subscribe();

        assert!(shutdown.trigger(ShutdownReason::Signal("SIGTERM")));
        assert!(!shutdown.trigger(ShutdownReason::Inactivity));

        assert_eq!(listener.wait().await, Some(ShutdownReason::Signal("SIGTERM")));
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Signal("SIGTERM")));
    }

    #[tokio::test]
    async fn test_waiter_woken_by_trigger() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(shutdown.subscribe().wait());
        tokio::task::yield_now().await;
        assert!(!shutdown.is_triggered());

        shutdown.trigger(ShutdownReason::Inactivity);
        assert_eq!(waiter.await.unwrap(), Some(ShutdownReason::Inactivity));
    }
}
