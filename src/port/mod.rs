//! Device channel: the serial connection to the scanner.
//!
//! Provides the `SerialPortAdapter` trait with a real (`serialport`) and a
//! mock implementation, plus blocking `std::io` halves for the reader threads.

pub mod channel;
pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use channel::{split, PortReader, PortWriter};
pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
