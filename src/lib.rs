//! Serial Points Library
//!
//! Bridges an operator terminal and a line-oriented serial scanner: operator
//! lines go to the device, device output is echoed, and point lines (tagged
//! `p`) are persisted into timestamped result files that rotate whenever the
//! operator issues a run command (tagged `r`).
//!
//! # Modules
//!
//! - `bridge`: wiring of the tasks below
//! - `config`: configuration with TOML support
//! - `console`: operator-facing output
//! - `error`: process-level error taxonomy
//! - `line`: boundary classification of stream lines
//! - `logging`: tracing subscriber setup
//! - `port`: device channel abstraction
//! - `reader`: device and operator reader threads
//! - `shutdown`: signal handling and the two-phase stop
//! - `sink`: the single-writer result file task

pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod line;
pub mod logging;
pub mod port;
pub mod reader;
pub mod shutdown;
pub mod sink;

// Re-export commonly used types for convenience
pub use bridge::{Bridge, BridgeOptions};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use console::{Console, ConsoleCapture};
pub use error::BridgeError;
pub use line::Line;
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
pub use shutdown::{ShutdownCoordinator, ShutdownState, TerminationListener, TerminationSignal};
pub use sink::{Clock, FileSink, SinkClient, SinkConfig, SinkHandle, SinkSummary, SystemClock};
