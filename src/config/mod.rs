//! Configuration for the bridge.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `--config <FILE>` on the command line
//! 2. `SERIAL_POINTS_CONFIG` environment variable
//! 3. `./serial-points.toml` (current directory)
//! 4. `serial-points.toml` in the platform config directory
//!    (`~/.config/serial-points/` on Linux)
//! 5. Built-in defaults (no file required)
//!
//! # Example file
//!
//! ```toml
//! [serial]
//! port = "scanner"
//! port_aliases = { scanner = "/dev/ttyUSB0" }
//!
//! [output]
//! directory = "/data/scans"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigOrigin, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, OutputConfig, SerialConfig, DEFAULT_SERIAL_PORT,
};
