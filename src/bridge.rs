//! Wires the device channel, the operator stream, the sink and the
//! shutdown coordinator together.

use crate::console::Console;
use crate::error::{fatal_channel, BridgeError, FatalReceiver};
use crate::port::{self, SerialPortAdapter};
use crate::reader::{self, OperatorOptions};
use crate::shutdown::{ShutdownCoordinator, TerminationSignal};
use crate::sink::{Clock, FileSink, SinkConfig, SinkHandle, SinkSummary, SystemClock};
use std::future::Future;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tracing::info;

/// Everything the bridge needs besides its two streams.
#[derive(Clone)]
pub struct BridgeOptions {
    pub sink: SinkConfig,
    pub console: Console,
    pub clock: Arc<dyn Clock>,
    /// Appended to every operator line forwarded to the device.
    pub write_terminator: Option<String>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            sink: SinkConfig::default(),
            console: Console::stdout(),
            clock: Arc::new(SystemClock),
            write_terminator: None,
        }
    }
}

/// A running bridge.
#[derive(Debug)]
pub struct Bridge {
    sink: SinkHandle,
    fatal: FatalReceiver,
    console: Console,
}

impl Bridge {
    /// Start the sink task and both reader threads.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<I>(
        port: Box<dyn SerialPortAdapter>,
        operator_input: I,
        options: BridgeOptions,
    ) -> Result<Self, BridgeError>
    where
        I: BufRead + Send + 'static,
    {
        let port_name = port.name().to_string();
        let (device_in, device_out) =
            port::split(port).map_err(|source| BridgeError::DeviceOpen {
                path: port_name.clone(),
                source,
            })?;

        let (fatal_tx, fatal_rx) = fatal_channel();
        let sink = FileSink::spawn(
            options.sink,
            options.console.clone(),
            options.clock,
            fatal_tx.clone(),
        );

        // Readers are detached; they end with their streams or at process exit.
        reader::spawn_device_reader(
            BufReader::new(device_in),
            port_name.clone(),
            options.console.clone(),
            sink.client(),
            fatal_tx.clone(),
        )?;
        reader::spawn_operator_reader(
            operator_input,
            device_out,
            OperatorOptions {
                port_name: port_name.clone(),
                write_terminator: options.write_terminator,
            },
            sink.client(),
            fatal_tx,
        )?;

        info!(port = %port_name, "bridge started");
        options.console.notice("started");

        Ok(Self {
            sink,
            fatal: fatal_rx,
            console: options.console,
        })
    }

    /// Hand control to the shutdown coordinator until `signal` fires or a
    /// task fails. Reader threads are not joined.
    pub async fn run_until<S>(self, signal: S) -> Result<SinkSummary, BridgeError>
    where
        S: Future<Output = std::io::Result<TerminationSignal>>,
    {
        ShutdownCoordinator::new(self.console)
            .run(signal, self.sink, self.fatal)
            .await
    }
}

impl std::fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("sink", &self.sink)
            .field("write_terminator", &self.write_terminator)
            .finish_non_exhaustive()
    }
}
