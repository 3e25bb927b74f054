//! Client configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Longest receive window accepted by [`ClientConfig::validate`].
///
/// `close()` is only observed between windows, so this bounds shutdown latency.
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Label used in log fields and the receive thread name
    pub name: String,
    /// Receive window passed to the native `receive` call
    pub poll_interval_ms: u64,
    /// Timeout applied when `request` is called without one
    pub default_timeout_ms: u64,
    /// Envelope field names
    pub wire: WireConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "tl-client".to_string(),
            poll_interval_ms: 250,
            default_timeout_ms: 30_000,
            wire: WireConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TL_CLIENT_NAME`: Client label (default: tl-client)
    /// - `TL_POLL_INTERVAL_MS`: Receive window (default: 250)
    /// - `TL_DEFAULT_TIMEOUT_MS`: Default request timeout (default: 30000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env::var("TL_CLIENT_NAME").unwrap_or(defaults.name),
            poll_interval_ms: env::var("TL_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            default_timeout_ms: env::var("TL_DEFAULT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_timeout_ms),
            wire: defaults.wire,
        }
    }

    /// Create a config for testing (short windows).
    pub fn for_testing() -> Self {
        Self {
            name: "tl-test".to_string(),
            poll_interval_ms: 10,
            default_timeout_ms: 2_000,
            wire: WireConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.contains('\0') {
            return Err(ConfigError::InvalidName(
                "name cannot contain a NUL byte".into(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(
                "poll_interval_ms cannot be 0".into(),
            ));
        }

        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidPollInterval(format!(
                "poll_interval_ms {} exceeds {}",
                self.poll_interval_ms, MAX_POLL_INTERVAL_MS
            )));
        }

        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "default_timeout_ms cannot be 0".into(),
            ));
        }

        self.wire.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Names of the envelope fields the client interprets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Field echoed back by the transport on the matching response
    pub correlation_field: String,
    /// Field naming the object type
    pub type_field: String,
    /// Type name of error objects
    pub error_type: String,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            correlation_field: "@extra".to_string(),
            type_field: "@type".to_string(),
            error_type: "error".to_string(),
        }
    }
}

impl WireConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("correlation_field", &self.correlation_field),
            ("type_field", &self.type_field),
            ("error_type", &self.error_type),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidWire(format!("{name} cannot be empty")));
            }
        }

        if self.correlation_field == self.type_field {
            return Err(ConfigError::InvalidWire(
                "correlation_field and type_field must differ".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("invalid poll interval: {0}")]
    InvalidPollInterval(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid wire configuration: {0}")]
    InvalidWire(String),
}
