//! Inactivity watchdog subsystem.
//!
//! # Data Flow
//! ```text
//! Request enters (layer.rs)
//!     → watchdog.enter(): in_flight += 1, generation += 1, deadline = now + timeout
//!     → inner service runs
//!     → InFlightGuard dropped: in_flight -= 1
//!     → last exit while Draining: re-arm for a full timeout
//!
//! Timing task (watchdog.rs):
//!     sleep until deadline
//!     → stale generation? re-read deadline and sleep again
//!     → current generation: Armed → Draining
//!     → in_flight == 0: Draining → Shutdown, invoke on_inactive once
//! ```
//!
//! # States
//! ```text
//! Armed ──activity──▶ Armed (new generation)
//! Armed ──deadline──▶ Draining
//! Draining ──activity──▶ Armed (drain cancelled)
//! Draining ──last exit──▶ Armed (new generation, idle period restarts)
//! Draining ──in_flight == 0 at deadline──▶ Shutdown
//! any ──stop()──▶ Stopped
//! ```
//!
//! # Design Decisions
//! - One mutex guards the count, phase, generation and deadline
//! - Resets never wake the timing task; a fire carries its generation and stale fires are dropped
//! - A request arriving mid-drain cancels the pending shutdown
//! - Exit accounting is RAII, so it runs on error, panic and cancellation

pub mod layer;
pub mod watchdog;

pub use layer::{InactivityLayer, InactivityService};
pub use watchdog::{InFlightGuard, Watchdog, WatchdogError, WatchdogState};
