//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: APP_HOST, INACTIVITY_TIMEOUT, ...)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the service starts with no file at all
//! - Environment wins over the file, matching how the platform injects settings
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, load_from_env, parse_config, ConfigError};
pub use schema::{
    InactivityConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig,
    ServiceInfoConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
