//! Inactivity watchdog.
//!
//! Tracks in-flight requests and a reset-on-activity deadline. When the
//! deadline elapses and no request is in flight, the `on_inactive` callback
//! is invoked exactly once from the watchdog's own task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::observability::metrics;

/// Errors raised when constructing a watchdog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchdogError {
    /// The inactivity timeout was zero.
    #[error("inactivity timeout must be greater than zero")]
    ZeroTimeout,

    /// No Tokio runtime was available to host the timing task.
    #[error("inactivity watchdog must be created inside a Tokio runtime")]
    NoRuntime,
}

/// Observable phase of the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Waiting for the deadline.
    Armed,
    /// Deadline elapsed; waiting for in-flight requests to finish.
    Draining,
    /// Callback invoked. Terminal.
    Shutdown,
    /// Explicitly stopped. Terminal.
    Stopped,
}

impl WatchdogState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WatchdogState::Shutdown | WatchdogState::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WatchdogState::Armed => "armed",
            WatchdogState::Draining => "draining",
            WatchdogState::Shutdown => "shutdown",
            WatchdogState::Stopped => "stopped",
        }
    }
}

type OnInactive = Box<dyn FnOnce() + Send + 'static>;

struct State {
    phase: WatchdogState,
    in_flight: usize,
    generation: u64,
    deadline: Instant,
    on_inactive: Option<OnInactive>,
}

struct Inner {
    timeout: Duration,
    state: Mutex<State>,
    /// Wakes the timing task on drain completion, drain cancellation and stop.
    wake: Notify,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock; recover rather than poison the request path.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a deadline that was scheduled under `generation`.
    fn on_deadline(&self, generation: u64) {
        let mut state = self.lock();
        if state.phase != WatchdogState::Armed || state.generation != generation {
            return;
        }
        state.phase = WatchdogState::Draining;
        tracing::info!(
            timeout_secs = self.timeout.as_secs_f64(),
            in_flight = state.in_flight,
            generation,
            "Inactivity timeout reached, waiting for in-flight requests"
        );
    }

    /// Move Draining → Shutdown when the deadline elapsed with nothing in flight,
    /// handing back the callback.
    fn try_finish(&self) -> Option<OnInactive> {
        let mut state = self.lock();
        if state.phase != WatchdogState::Draining || state.in_flight > 0 {
            return None;
        }
        state.phase = WatchdogState::Shutdown;
        state.on_inactive.take()
    }

    /// Record a request leaving. A drain that completes re-arms a full
    /// timeout; the service must then stay idle that long before shutdown.
    fn exit(&self) {
        let mut state = self.lock();
        debug_assert!(state.in_flight > 0, "in-flight count underflow");
        state.in_flight = state.in_flight.saturating_sub(1);
        metrics::record_in_flight(state.in_flight);

        let drained = state.in_flight == 0 && state.phase == WatchdogState::Draining;
        if drained {
            state.phase = WatchdogState::Armed;
            state.generation += 1;
            state.deadline = Instant::now() + self.timeout;
        }
        let generation = state.generation;
        drop(state);

        if drained {
            tracing::info!(generation, "In-flight requests drained, inactivity deadline re-armed");
            // The timing task is parked on the drain; it must pick up the new deadline.
            self.wake.notify_one();
        }
    }
}

/// Handle to an inactivity watchdog. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Watchdog {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Watchdog")
            .field("timeout", &self.inner.timeout)
            .field("phase", &state.phase)
            .field("in_flight", &state.in_flight)
            .field("generation", &state.generation)
            .finish()
    }
}

impl Watchdog {
    /// Create a watchdog armed for `timeout` and spawn its timing task.
    ///
    /// `on_inactive` runs on the timing task, at most once, once a full
    /// `timeout` has elapsed with no request arriving or in flight.
    pub fn new<F>(timeout: Duration, on_inactive: F) -> Result<Self, WatchdogError>
    where
        F: FnOnce() + Send + 'static,
    {
        if timeout.is_zero() {
            return Err(WatchdogError::ZeroTimeout);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchdogError::NoRuntime)?;

        let inner = Arc::new(Inner {
            timeout,
            state: Mutex::new(State {
                phase: WatchdogState::Armed,
                in_flight: 0,
                generation: 0,
                deadline: Instant::now() + timeout,
                on_inactive: Some(Box::new(on_inactive)),
            }),
            wake: Notify::new(),
        });

        runtime.spawn(watch(inner.clone()));
        tracing::info!(timeout_secs = timeout.as_secs_f64(), "Inactivity watchdog armed");

        Ok(Self { inner })
    }

    /// Record a request entering. The returned guard records its exit when dropped.
    pub fn enter(&self) -> InFlightGuard {
        let mut state = self.inner.lock();
        state.in_flight += 1;
        let in_flight = state.in_flight;
        metrics::record_in_flight(in_flight);

        let mut cancelled_drain = false;
        if !state.phase.is_terminal() {
            cancelled_drain = state.phase == WatchdogState::Draining;
            state.phase = WatchdogState::Armed;
            state.generation += 1;
            state.deadline = Instant::now() + self.inner.timeout;
        }
        let generation = state.generation;
        drop(state);

        if cancelled_drain {
            tracing::info!(generation, "Request arrived while draining, shutdown cancelled");
            // The timing task is parked on the drain; it must pick up the new deadline.
            self.inner.wake.notify_one();
        } else {
            tracing::debug!(generation, in_flight, "Inactivity deadline reset");
        }
        metrics::record_reset();

        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    /// Wrap a service so every request it handles counts as activity.
    pub fn wrap<S>(&self, inner: S) -> super::InactivityService<S> {
        super::InactivityService::new(inner, self.clone())
    }

    /// A `tower::Layer` applying [`Watchdog::wrap`].
    pub fn layer(&self) -> super::InactivityLayer {
        super::InactivityLayer::new(self.clone())
    }

    /// Cancel the watchdog. Idempotent; does nothing once the callback has run.
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        if state.phase.is_terminal() {
            return;
        }
        state.phase = WatchdogState::Stopped;
        let callback = state.on_inactive.take();
        drop(state);

        // Drop the callback outside the lock; its captures may do arbitrary work.
        drop(callback);
        self.inner.wake.notify_one();
        tracing::info!("Inactivity watchdog stopped");
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    pub fn state(&self) -> WatchdogState {
        self.inner.lock().phase
    }

    /// Number of re-arms since construction.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }
}

/// RAII marker for one in-flight request.
#[must_use = "the request counts as in flight only while the guard is alive"]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightGuard").finish_non_exhaustive()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.exit();
    }
}

/// Timing task. Exits once the watchdog reaches a terminal state.
async fn watch(inner: Arc<Inner>) {
    loop {
        let wake = inner.wake.notified();
        tokio::pin!(wake);
        // Register before reading state so a notify between the read and the await is not lost.
        wake.as_mut().enable();

        let (phase, generation, deadline) = {
            let state = inner.lock();
            (state.phase, state.generation, state.deadline)
        };

        match phase {
            WatchdogState::Shutdown | WatchdogState::Stopped => return,
            WatchdogState::Armed => {
                tokio::select! {
                    _ = time::sleep_until(deadline) => inner.on_deadline(generation),
                    _ = &mut wake => {}
                }
            }
            WatchdogState::Draining => wake.await,
        }

        if let Some(on_inactive) = inner.try_finish() {
            tracing::info!(
                timeout_secs = inner.timeout.as_secs_f64(),
                "All requests done, shutting down due to inactivity"
            );
            metrics::record_inactivity_shutdown();
            on_inactive();
            return;
        }
    }
}
