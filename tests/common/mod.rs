//! Shared test utilities for the bridge integration tests.
//!
//! - A scripted operator stream fed line by line from the test
//! - A deterministic clock for result file names
//! - A harness running a whole bridge against a `MockSerialPort`

#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use parking_lot::Mutex;
use serial_points::{
    Bridge, BridgeError, BridgeOptions, Clock, Console, ConsoleCapture, MockSerialPort,
    SinkConfig, SinkSummary, TerminationSignal,
};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Starts at 2024-01-01 00:00:00 local time and advances one second per reading.
pub struct SteppingClock(Mutex<DateTime<Local>>);

impl SteppingClock {
    pub fn new() -> Arc<Self> {
        let start = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Arc::new(Self(Mutex::new(start)))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut now = self.0.lock();
        let current = *now;
        *now = current + ChronoDuration::seconds(1);
        current
    }
}

/// Blocking reader over chunks sent from the test; EOF once the sender drops.
pub struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Test side of the operator's stdin.
pub struct OperatorFeed {
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl OperatorFeed {
    /// Type a line (the `\n` is added).
    pub fn line(&self, text: &str) {
        if let Some(tx) = &self.tx {
            tx.send(format!("{text}\n").into_bytes())
                .expect("operator reader gone");
        }
    }

    /// Close stdin.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

pub fn operator_stream() -> (OperatorFeed, BufReader<ChannelReader>) {
    let (tx, rx) = mpsc::channel();
    let reader = ChannelReader {
        rx,
        pending: Vec::new(),
        pos: 0,
    };
    (OperatorFeed { tx: Some(tx) }, BufReader::new(reader))
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Result files in `dir`, sorted by name.
pub fn result_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    files.sort();
    files
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// A whole bridge running against a mock device in a temporary directory.
pub struct TestBridge {
    pub device: MockSerialPort,
    pub operator: OperatorFeed,
    pub console: ConsoleCapture,
    pub dir: tempfile::TempDir,
    signal: Option<oneshot::Sender<TerminationSignal>>,
    run: JoinHandle<Result<SinkSummary, BridgeError>>,
}

impl TestBridge {
    /// Start a bridge. Must be called from a multi-threaded Tokio runtime.
    pub fn start() -> Self {
        Self::start_with(|_| {})
    }

    pub fn start_with(customize: impl FnOnce(&mut BridgeOptions)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = MockSerialPort::new("MOCK0");
        let (operator, operator_input) = operator_stream();
        let (console, capture) = Console::capture();

        let mut options = BridgeOptions {
            sink: SinkConfig {
                directory: dir.path().to_path_buf(),
                ..SinkConfig::default()
            },
            console,
            clock: SteppingClock::new(),
            write_terminator: None,
        };
        customize(&mut options);

        let bridge = Bridge::start(Box::new(device.clone()), operator_input, options)
            .expect("bridge start");

        let (signal_tx, signal_rx) = oneshot::channel::<TerminationSignal>();
        let run = tokio::spawn(bridge.run_until(async move {
            signal_rx
                .await
                .map_err(|_| io::Error::other("signal sender dropped"))
        }));

        Self {
            device,
            operator,
            console: capture,
            dir,
            signal: Some(signal_tx),
            run,
        }
    }

    pub fn result_files(&self) -> Vec<PathBuf> {
        result_files(self.dir.path())
    }

    /// Wait until `count` result files exist.
    pub async fn wait_for_files(&self, count: usize) -> bool {
        let dir = self.dir.path().to_path_buf();
        wait_until(Duration::from_secs(5), || result_files(&dir).len() == count).await
    }

    /// Wait until the newest result file holds exactly `contents`.
    pub async fn wait_for_contents(&self, contents: &str) -> bool {
        let dir = self.dir.path().to_path_buf();
        wait_until(Duration::from_secs(5), || {
            result_files(&dir).last().map(|p| read(p)) == Some(contents.to_string())
        })
        .await
    }

    /// Deliver a termination signal and wait for the bridge to finish.
    pub async fn signal(&mut self, signal: TerminationSignal) -> Result<SinkSummary, BridgeError> {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(signal);
        }
        self.finish().await
    }

    /// Wait for the bridge to finish on its own (fatal error).
    pub async fn finish(&mut self) -> Result<SinkSummary, BridgeError> {
        let result = tokio::time::timeout(Duration::from_secs(5), &mut self.run)
            .await
            .expect("bridge did not finish")
            .expect("bridge task panicked");
        self.close_streams();
        result
    }

    /// Let both reader threads run to end of stream.
    pub fn close_streams(&mut self) {
        self.operator.close();
        self.device.close_input();
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.close_streams();
    }
}
