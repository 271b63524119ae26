//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigOrigin, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_POINTS";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-points.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_POINTS_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` (the `--config` flag)
    /// 2. `SERIAL_POINTS_CONFIG` environment variable
    /// 3. `./serial-points.toml` (current directory)
    /// 4. `serial-points.toml` in the platform config directory
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let config_path = resolve_config_path(explicit)?;

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        if let Some(ref path) = config_path {
            tracing::debug!(path = %path.display(), "configuration loaded");
        }

        Ok(Self { config_path, config })
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
///
/// An explicitly requested file (flag or environment) that does not exist is
/// an error; the implicit locations are simply skipped.
pub fn resolve_config_path(explicit: Option<&Path>) -> ConfigResult<Option<PathBuf>> {
    let requested = explicit
        .map(|p| (p.to_path_buf(), ConfigOrigin::Flag))
        .or_else(|| {
            std::env::var_os(CONFIG_PATH_ENV).map(|p| (PathBuf::from(p), ConfigOrigin::Env))
        });
    if let Some((path, origin)) = requested {
        return if path.exists() {
            Ok(Some(path))
        } else {
            Err(ConfigError::Missing { path, origin })
        };
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Ok(Some(app_config));
        }
    }

    Ok(None)
}

/// Platform config directory for this application.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "serial-points").map(|d| d.config_dir().to_path_buf())
}

/// Default config file path inside [`get_default_config_dir`].
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply environment variable overrides to the configuration.
///
/// - `SERIAL_POINTS_SERIAL_PORT=/dev/ttyUSB0`
/// - `SERIAL_POINTS_OUTPUT_DIR=/data/scans`
/// - `SERIAL_POINTS_LOG_LEVEL=debug`
/// - `SERIAL_POINTS_LOG_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(format!("{}_SERIAL_PORT", ENV_PREFIX)) {
        config.serial.port = val;
    }
    if let Some(val) = std::env::var_os(format!("{}_OUTPUT_DIR", ENV_PREFIX)) {
        config.output.directory = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    let var = format!("{}_LOG_FORMAT", ENV_PREFIX);
    if let Ok(value) = std::env::var(&var) {
        config.logging.format = match value.parse::<LogFormat>() {
            Ok(format) => format,
            Err(_) => {
                return Err(ConfigError::BadOverride {
                    var,
                    value,
                    expected: "log format (json, pretty or compact)",
                })
            }
        };
    }

    Ok(())
}
