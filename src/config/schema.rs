//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults, so an empty file (or no file) is valid.

use super::error::{ConfigError, ConfigResult};
use crate::port::{PortConfiguration, DEFAULT_BAUD_RATE};
use crate::sink::SinkConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Serial device used when neither the CLI nor the config names one.
#[cfg(windows)]
pub const DEFAULT_SERIAL_PORT: &str = "COM1";
/// Serial device used when neither the CLI nor the config names one.
#[cfg(not(windows))]
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyS0";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device configuration
    pub serial: SerialConfig,
    /// Result file configuration
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::invalid("serial.port", "must not be empty"));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::invalid("serial.timeout_ms", "must be greater than 0"));
        }
        if self.output.prefix.is_empty() {
            return Err(ConfigError::invalid("output.prefix", "must not be empty"));
        }
        if self.output.extension.is_empty() || self.output.extension.starts_with('.') {
            return Err(ConfigError::invalid(
                "output.extension",
                "must be non-empty and given without the leading dot",
            ));
        }
        if self.output.queue_depth == 0 {
            return Err(ConfigError::invalid("output.queue_depth", "must be greater than 0"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "must not be empty"));
        }
        Ok(())
    }
}

/// Serial device configuration section.
///
/// There is no baud rate setting: the scanner always talks at
/// [`DEFAULT_BAUD_RATE`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Device path or alias
    pub port: String,
    /// Read timeout in milliseconds; bounds how long a single read blocks
    pub timeout_ms: u64,
    /// Appended to every operator line sent to the device (none by default)
    pub write_terminator: Option<String>,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            timeout_ms: 1000,
            write_terminator: None,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Get the read timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// The configured device path, alias-resolved.
    pub fn device_path(&self) -> String {
        self.resolve_port(&self.port)
    }

    /// Port parameters for opening the device.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: self.timeout(),
            ..PortConfiguration::default()
        }
    }
}

/// Result file configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory result files are created in
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// File extension, without the dot
    pub extension: String,
    /// Pending sink requests before producers block
    pub queue_depth: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "points".to_string(),
            extension: "asdp".to_string(),
            queue_depth: 64,
        }
    }
}

impl OutputConfig {
    /// Sink settings derived from this section.
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            directory: self.directory.clone(),
            prefix: self.prefix.clone(),
            extension: self.extension.clone(),
            queue_depth: self.queue_depth,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty multi-line format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::invalid(
                "logging.format",
                format!("unknown format '{other}' (expected json, pretty or compact)"),
            )),
        }
    }
}
