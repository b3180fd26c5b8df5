//! Router configuration.
//!
//! Loaded from the process environment:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `ENVIRONMENT` | `LOCAL`, `DEV` or `DEVELOPMENT` (any case) enables development mode | production |
//! | `ROUTER_LOGGING` | boolean, logs every handled request | `false` |
//! | `ROUTER_BODY_LIMIT` | maximum body size in bytes | 2 MiB |
//!
//! # Example
//!
//! ```no_run
//! use route_bind_web::RouterConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouterConfig::from_env()?;
//! if config.development {
//!     println!("error messages will be sent to clients");
//! }
//! # Ok(())
//! # }
//! ```

use route_bind_core::Coerce;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable selecting the deployment environment.
pub const ENVIRONMENT: &str = "ENVIRONMENT";
/// Environment variable enabling request logging.
pub const ROUTER_LOGGING: &str = "ROUTER_LOGGING";
/// Environment variable holding the body size limit.
pub const ROUTER_BODY_LIMIT: &str = "ROUTER_BODY_LIMIT";

/// Default maximum request body size.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

const DEVELOPMENT_NAMES: [&str; 3] = ["LOCAL", "DEV", "DEVELOPMENT"];

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be parsed
    #[error("invalid value for {variable}: {reason}")]
    Invalid {
        /// Variable name
        variable: &'static str,
        /// Parse failure
        reason: String,
    },
}

/// Router settings shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Send error messages and type headers to clients
    pub development: bool,
    /// Log every handled request
    pub logging: bool,
    /// Maximum request body size in bytes
    pub body_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            development: false,
            logging: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouterConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `ROUTER_LOGGING` or `ROUTER_BODY_LIMIT` is set
    /// but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(environment) = lookup(ENVIRONMENT) {
            let upper = environment.trim().to_ascii_uppercase();
            config.development = DEVELOPMENT_NAMES.contains(&upper.as_str());
        }
        if let Some(raw) = lookup(ROUTER_LOGGING).filter(|v| !v.is_empty()) {
            config.logging = parse(ROUTER_LOGGING, &raw)?;
        }
        if let Some(raw) = lookup(ROUTER_BODY_LIMIT).filter(|v| !v.is_empty()) {
            config.body_limit = parse(ROUTER_BODY_LIMIT, &raw)?;
        }

        tracing::debug!(
            development = config.development,
            logging = config.logging,
            body_limit = config.body_limit,
            "Router configuration loaded"
        );
        Ok(config)
    }

    /// Set development mode.
    #[must_use]
    pub const fn development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    /// Set request logging.
    #[must_use]
    pub const fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Set the body size limit.
    #[must_use]
    pub const fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

fn parse<T: Coerce>(variable: &'static str, raw: &str) -> Result<T, ConfigError> {
    T::coerce(raw.trim()).map_err(|kind| ConfigError::Invalid {
        variable,
        reason: kind.to_string(),
    })
}
