//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init metrics → Bind listener → Arm watchdog → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger (signal or inactivity) → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The watchdog only knows a callback; the callback triggers the same
//!   shutdown path as a signal
//! - Shutdown has a deadline: connections still open after the grace period are dropped

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener, ShutdownReason};
pub use startup::{run, serve, StartupError};
