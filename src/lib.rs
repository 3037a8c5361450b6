//! Scale-to-zero HTTP service library.
//!
//! A small item-storage API whose process shuts itself down after a period
//! without requests. The [`inactivity`] watchdog is the core; everything
//! else is the service around it.

pub mod config;
pub mod http;
pub mod inactivity;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use inactivity::{Watchdog, WatchdogError, WatchdogState};
pub use lifecycle::{Shutdown, ShutdownReason};
