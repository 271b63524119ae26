//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a scanner on the other end of
//! the wire without requiring actual hardware. Clones share one state, so a
//! test can keep a handle to feed device output while the bridge owns others.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every buffer passed to `write_bytes`, in order.
    write_log: Vec<Vec<u8>>,
    /// Once set, an empty read queue reads as end of stream.
    input_closed: bool,
    /// Fail the next read with this error kind.
    read_failure: Option<std::io::ErrorKind>,
    /// Fail every write with this error kind.
    write_failure: Option<std::io::ErrorKind>,
    /// Configured timeout duration.
    timeout: Duration,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    readable: Condvar,
}

/// Mock serial port implementation for testing.
///
/// This implementation allows you to:
/// - Enqueue device output from any thread, waking a blocked reader
/// - Inspect what data was written
/// - Simulate end of stream and read/write failures
///
/// # Example
/// ```
/// use serial_points::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"p1.5\n");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"p1.5\n");
///
/// port.write_bytes(b"r").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"r".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let shared = Shared::default();
        shared.state.lock().timeout = Duration::from_millis(100);
        Self {
            name: name.into(),
            shared: Arc::new(shared),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.readable.notify_all();
    }

    /// Enqueue a device line, appending the `\n` separator.
    pub fn enqueue_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.enqueue_read(&bytes);
    }

    /// Simulate the device hanging up: once the queue drains, reads return `Ok(0)`.
    pub fn close_input(&self) {
        self.shared.state.lock().input_closed = true;
        self.shared.readable.notify_all();
    }

    /// Make the next read fail with the given error kind (after queued bytes drain).
    pub fn fail_next_read(&self, kind: std::io::ErrorKind) {
        self.shared.state.lock().read_failure = Some(kind);
        self.shared.readable.notify_all();
    }

    /// Make every subsequent write fail with the given error kind.
    pub fn fail_writes(&self, kind: std::io::ErrorKind) {
        self.shared.state.lock().write_failure = Some(kind);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes joined together.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Get whether buffers have been cleared.
    pub fn was_cleared(&self) -> bool {
        self.shared.state.lock().buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        if let Some(kind) = state.write_failure {
            return Err(PortError::Io(std::io::Error::new(kind, "mock write failure")));
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.read_queue.is_empty() && state.read_failure.is_none() && !state.input_closed {
            let timeout = state.timeout;
            self.shared.readable.wait_for(&mut state, timeout);
        }

        if !state.read_queue.is_empty() {
            let n = buffer.len().min(state.read_queue.len());
            for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
                *slot = byte;
            }
            return Ok(n);
        }

        if let Some(kind) = state.read_failure.take() {
            return Err(PortError::Io(std::io::Error::new(kind, "mock read failure")));
        }

        if state.input_closed {
            return Ok(0);
        }

        Err(PortError::timeout(state.timeout))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.shared.state.lock().timeout = timeout;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
