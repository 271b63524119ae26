//! `std::io` views over a [`SerialPortAdapter`].
//!
//! The bridge reads device output on one thread and forwards operator input
//! on another. [`split`] hands each side its own handle so neither blocks the
//! other.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use std::io::{self, Read, Write};

/// Read half of the device channel.
///
/// Unlike the adapter, a `PortReader` blocks until data arrives: timeouts are
/// swallowed and the read is retried. `Ok(0)` is only returned at end of stream.
#[derive(Debug)]
pub struct PortReader {
    port: Box<dyn SerialPortAdapter>,
}

/// Write half of the device channel.
#[derive(Debug)]
pub struct PortWriter {
    port: Box<dyn SerialPortAdapter>,
}

/// Split a port into independently owned read and write halves.
pub fn split(port: Box<dyn SerialPortAdapter>) -> Result<(PortReader, PortWriter), PortError> {
    let writer = port.try_clone_adapter()?;
    Ok((PortReader { port }, PortWriter { port: writer }))
}

impl Read for PortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.port.read_bytes(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.is_transient() => continue,
                Err(e) => return Err(e.into_io()),
            }
        }
    }
}

impl Write for PortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match self.port.write_bytes(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.is_transient() => continue,
                Err(e) => return Err(e.into_io()),
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
