//! Configuration errors. All of them end the process with the config exit code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where an explicitly requested config file path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// `--config <FILE>`
    Flag,
    /// `SERIAL_POINTS_CONFIG`
    Env,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("--config"),
            Self::Env => f.write_str("SERIAL_POINTS_CONFIG"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file named by `--config` or `SERIAL_POINTS_CONFIG` does not exist.
    /// Implicit locations are skipped silently instead.
    #[error("config file {} (from {origin}) does not exist", path.display())]
    Missing { path: PathBuf, origin: ConfigOrigin },

    #[error("cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid serial-points.toml at {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but cannot be used, e.g. `output.queue_depth = 0`.
    #[error("config key {key} {reason}")]
    Invalid { key: &'static str, reason: String },

    /// A `SERIAL_POINTS_*` override could not be parsed.
    #[error("environment override {var}={value:?} is not a valid {expected}")]
    BadOverride {
        var: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
