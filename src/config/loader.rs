//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}='{value}': {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |name| std::env::var(name).ok())
}

/// Parse TOML text, overlay variables from `lookup`, and validate.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: ServiceConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus environment overrides, validated. Used when no file is given.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    let mut config = ServiceConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay platform environment variables on `config`.
///
/// Recognised: `APP_HOST`, `APP_PORT`, `ENABLE_INACTIVITY_TIMEOUT`,
/// `INACTIVITY_TIMEOUT` (seconds), `FLY_REGION`, `LOG_LEVEL`.
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let host = get("APP_HOST");
    let port = get("APP_PORT");
    if host.is_some() || port.is_some() {
        let (current_host, current_port) = split_host_port(&config.listener.bind_address);
        let host = host.unwrap_or(current_host);
        let port = match port {
            Some(p) => {
                p.trim().parse::<u16>().map_err(|_| ConfigError::Env {
                    name: "APP_PORT",
                    value: p.clone(),
                    reason: "expected a port number",
                })?;
                p.trim().to_string()
            }
            None => current_port,
        };
        config.listener.bind_address = join_host_port(host.trim(), &port);
    }

    if let Some(value) = get("ENABLE_INACTIVITY_TIMEOUT") {
        config.inactivity.enabled = parse_bool(&value).ok_or_else(|| ConfigError::Env {
            name: "ENABLE_INACTIVITY_TIMEOUT",
            value: value.clone(),
            reason: "expected true or false",
        })?;
    }

    if let Some(value) = get("INACTIVITY_TIMEOUT") {
        config.inactivity.timeout_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            name: "INACTIVITY_TIMEOUT",
            value: value.clone(),
            reason: "expected whole seconds",
        })?;
    }

    if let Some(region) = get("FLY_REGION") {
        config.service.region = region;
    }

    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level.trim().to_lowercase();
    }

    Ok(())
}

fn split_host_port(addr: &str) -> (String, String) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (
            host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port.to_string(),
        ),
        None => (addr.to_string(), "8080".to_string()),
    }
}

fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
