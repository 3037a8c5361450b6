//! Configuration validation.
//!
//! Returns every problem found, not just the first, so a bad deploy can be
//! fixed in one pass.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': expected host:port")]
    InvalidAddress { field: &'static str, value: String },

    #[error("inactivity.timeout_secs must be greater than zero when inactivity is enabled")]
    ZeroInactivityTimeout,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),
}

/// Validate a configuration. Pure function of its input.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.inactivity.enabled && config.inactivity.timeout_secs == 0 {
        errors.push(ValidationError::ZeroInactivityTimeout);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.observability.log_level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric port. Hostnames are left
/// for the listener to resolve at bind time.
fn is_host_port(addr: &str) -> bool {
    if addr.parse::<SocketAddr>().is_ok() {
        return true;
    }
    let Some((host, port)) = addr.rsplit_once(':') else {
        return false;
    };
    !host.is_empty()
        && !host.contains(':')
        && !host.chars().any(char::is_whitespace)
        && port.parse::<u16>().is_ok()
}
