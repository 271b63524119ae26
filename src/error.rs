use crate::config::ConfigError;
use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel on which a task reports the fatal error that ended it.
pub type FatalSender = mpsc::UnboundedSender<BridgeError>;

/// Receiving end of [`FatalSender`], owned by the shutdown coordinator.
pub type FatalReceiver = mpsc::UnboundedReceiver<BridgeError>;

/// Create the fatal-report channel shared by all bridge tasks.
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}

/// Log a fatal error at the point of detection and hand it to the coordinator.
pub fn report_fatal(fatal: &FatalSender, err: BridgeError) {
    tracing::error!(error = %err, "fatal error");
    // The coordinator is gone only if the process is already on its way out.
    let _ = fatal.send(err);
}

/// Process-level error taxonomy.
///
/// Every variant is fatal: it is logged where it is detected, handed to the
/// shutdown coordinator and turned into a non-zero exit status by `main`.
/// Recoverable conditions (operator input errors, end of stream) never become
/// a `BridgeError`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Error opening serial port {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("Error reading from serial port {port}: {source}")]
    DeviceRead {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error writing to serial port {port}: {source}")]
    DeviceWrite {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to open output file {}: {source}", path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write output file {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A point line arrived before any rotation opened a result file.
    #[error(
        "Trying to write points file before opening it! Scanner sending wrong messages? Message was: p{payload}"
    )]
    WriteBeforeRotation { payload: String },

    #[error("unable to start {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to listen for termination signals: {0}")]
    Signal(#[source] std::io::Error),

    /// The sink task ended without acknowledging a stop request.
    #[error("output file sink stopped unexpectedly")]
    SinkUnavailable,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to initialise logging: {0}")]
    Logging(String),
}

impl BridgeError {
    /// Exit status reported to the hosting environment.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => exit_codes::CONFIG_ERROR,
            Self::DeviceOpen { .. } | Self::DeviceRead { .. } | Self::DeviceWrite { .. } => {
                exit_codes::DEVICE_ERROR
            }
            Self::FileCreate { .. } | Self::FileWrite { .. } => exit_codes::RESULT_FILE_ERROR,
            Self::WriteBeforeRotation { .. } => exit_codes::PROTOCOL_ERROR,
            Self::Spawn { .. } | Self::Signal(_) | Self::SinkUnavailable | Self::Logging(_) => {
                exit_codes::ERROR
            }
        }
    }
}

/// Exit statuses used by the binary.
pub mod exit_codes {
    /// Orderly shutdown.
    pub const SUCCESS: u8 = 0;
    /// Anything not covered below.
    pub const ERROR: u8 = 1;
    /// Configuration could not be loaded or is invalid.
    pub const CONFIG_ERROR: u8 = 2;
    /// The serial device could not be opened, read or written.
    pub const DEVICE_ERROR: u8 = 3;
    /// A result file could not be created or written.
    pub const RESULT_FILE_ERROR: u8 = 4;
    /// The device sent point data before any result file was opened.
    pub const PROTOCOL_ERROR: u8 = 5;
}
