//! The two stream readers.
//!
//! Each runs on its own OS thread because both streams only offer blocking
//! reads. Errors are resolved here: device channel failures are reported as
//! fatal, operator input failures are logged and only stop this reader.

use crate::console::Console;
use crate::error::{report_fatal, BridgeError, FatalSender};
use crate::line::Line;
use crate::sink::SinkClient;
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Why a reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The stream reached end of input.
    EndOfStream,
    /// The sink stopped accepting requests (shutdown in progress).
    SinkClosed,
    /// Operator input failed; logged, not fatal.
    InputFailed,
    /// The device channel failed; reported as fatal.
    DeviceFailed,
}

/// Operator reader settings.
#[derive(Debug, Clone, Default)]
pub struct OperatorOptions {
    /// Name of the device, for diagnostics.
    pub port_name: String,
    /// Bytes appended after every forwarded line. `None` forwards the line
    /// exactly as typed, separator removed.
    pub write_terminator: Option<String>,
}

/// Drain the device stream: persist point lines, echo the rest.
pub fn run_device_reader<R: BufRead>(
    mut reader: R,
    port_name: &str,
    console: &Console,
    sink: &SinkClient,
    fatal: &FatalSender,
) -> ReaderExit {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                info!(port = port_name, "device stream ended");
                return ReaderExit::EndOfStream;
            }
            Ok(_) => {}
            Err(source) => {
                let err = BridgeError::DeviceRead {
                    port: port_name.to_string(),
                    source,
                };
                report_fatal(fatal, err);
                return ReaderExit::DeviceFailed;
            }
        }

        let raw = String::from_utf8_lossy(&buf);
        match Line::device(&raw) {
            Line::DataPoint { payload } => {
                if sink.blocking_write(payload).is_err() {
                    debug!(payload, "sink closed; dropping point and stopping device reader");
                    return ReaderExit::SinkClosed;
                }
            }
            Line::Rotate(text) | Line::Passthrough(text) => console.device_line(text),
        }
    }
}

/// Drain operator input: forward every line to the device, rotating the
/// result file first when the line is a rotation command.
pub fn run_operator_reader<R: BufRead, W: Write>(
    mut reader: R,
    mut device: W,
    options: &OperatorOptions,
    sink: &SinkClient,
    fatal: &FatalSender,
) -> ReaderExit {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                info!("operator input closed");
                return ReaderExit::EndOfStream;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "operator input failed; no longer forwarding commands");
                return ReaderExit::InputFailed;
            }
        }

        let bytes = strip_line_ending(&buf);
        if let Line::Rotate(command) = Line::operator(&String::from_utf8_lossy(bytes)) {
            debug!(command, "rotation command");
            if sink.blocking_rotate().is_err() {
                debug!("sink closed; stopping operator reader");
                return ReaderExit::SinkClosed;
            }
        }

        if let Err(source) = forward(&mut device, bytes, options.write_terminator.as_deref()) {
            let err = BridgeError::DeviceWrite {
                port: options.port_name.clone(),
                source,
            };
            report_fatal(fatal, err);
            return ReaderExit::DeviceFailed;
        }
    }
}

/// Run [`run_device_reader`] on a named thread.
pub fn spawn_device_reader<R>(
    reader: R,
    port_name: String,
    console: Console,
    sink: SinkClient,
    fatal: FatalSender,
) -> Result<JoinHandle<ReaderExit>, BridgeError>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("device-reader".into())
        .spawn(move || run_device_reader(reader, &port_name, &console, &sink, &fatal))
        .map_err(|source| BridgeError::Spawn {
            name: "device-reader",
            source,
        })
}

/// Run [`run_operator_reader`] on a named thread.
pub fn spawn_operator_reader<R, W>(
    reader: R,
    device: W,
    options: OperatorOptions,
    sink: SinkClient,
    fatal: FatalSender,
) -> Result<JoinHandle<ReaderExit>, BridgeError>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name("operator-reader".into())
        .spawn(move || run_operator_reader(reader, device, &options, &sink, &fatal))
        .map_err(|source| BridgeError::Spawn {
            name: "operator-reader",
            source,
        })
}

fn forward<W: Write>(device: &mut W, line: &[u8], terminator: Option<&str>) -> std::io::Result<()> {
    device.write_all(line)?;
    if let Some(terminator) = terminator {
        device.write_all(terminator.as_bytes())?;
    }
    device.flush()
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
