//! Port-specific error types.
//!
//! Kept separate from [`crate::error::BridgeError`] so the device channel can be
//! used (and tested) without pulling in the bridge's process-level taxonomy.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A second handle onto the same device could not be created.
    #[error("Unable to clone port handle for {0}")]
    Clone(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Whether this error only means "nothing arrived within the timeout".
    ///
    /// Serial reads are bounded by the port timeout; a reader that wants
    /// blocking semantics retries on these instead of giving up.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Convert into a `std::io::Error`, preserving the kind where one exists.
    pub fn into_io(self) -> std::io::Error {
        match self {
            Self::Io(e) => e,
            Self::Timeout(d) => {
                std::io::Error::new(std::io::ErrorKind::TimedOut, format!("timed out after {d:?}"))
            }
            Self::NotFound(name) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("port not found: {name}"))
            }
            other => std::io::Error::other(other),
        }
    }
}
