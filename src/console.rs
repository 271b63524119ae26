//! Operator-facing console output.
//!
//! The console carries device echo (`> `) and status notices (`>> `) only.
//! Diagnostics go through `tracing` to stderr.

use parking_lot::Mutex;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

/// Cloneable handle to the operator's console.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Console backed by the process's standard output.
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Console backed by an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Console writing into memory, plus a handle to read it back.
    pub fn capture() -> (Self, ConsoleCapture) {
        let capture = ConsoleCapture::default();
        (Self::from_writer(capture.clone()), capture)
    }

    /// Echo a line received from the device.
    pub fn device_line(&self, line: &str) {
        self.emit(format_args!("> {line}"));
    }

    /// Print a status notice.
    pub fn notice(&self, message: impl Display) {
        self.emit(format_args!(">> {message}"));
    }

    fn emit(&self, line: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        // Nothing sensible to do if stdout is gone.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// In-memory console sink used by tests.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl ConsoleCapture {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Everything written so far, split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for ConsoleCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
