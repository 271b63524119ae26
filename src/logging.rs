//! Diagnostic logging setup.
//!
//! Logs go to stderr so the console (stdout) only carries device echo and
//! status notices. `RUST_LOG`, when set, takes precedence over the configured
//! level.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::BridgeError;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if present and valid, else `config.level`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, BridgeError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| BridgeError::Logging(format!("invalid level '{}': {e}", config.level))),
    }
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), BridgeError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| BridgeError::Logging(e.to_string()))
}
