//! Output file sink.
//!
//! A single Tokio task owns the (at most one) open result file. Producers
//! reach it only through [`SinkClient`], whose rotation and write requests
//! share one queue, so the task sees them in arrival order and handles them
//! one at a time. [`SinkHandle::shutdown`] is the two-phase stop: the first
//! phase closes the stop channel, the task drains what was already queued,
//! closes the file and answers the second phase with a [`SinkSummary`].

mod clock;
mod file;

pub use clock::{Clock, SystemClock};
pub use file::{file_name, ResultFile, TIMESTAMP_FORMAT};

use crate::console::Console;
use crate::error::{report_fatal, BridgeError, FatalSender};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Where and how result files are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub extension: String,
    /// Requests buffered before producers block.
    pub queue_depth: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "points".to_string(),
            extension: "asdp".to_string(),
            queue_depth: 64,
        }
    }
}

/// What the sink did over its lifetime, reported with the stop acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkSummary {
    /// Every result file created, in creation order.
    pub files: Vec<PathBuf>,
    pub records_written: u64,
}

/// Returned by [`SinkClient`] once the sink no longer accepts requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("output file sink is no longer accepting requests")]
pub struct SinkClosed;

#[derive(Debug)]
enum SinkRequest {
    Rotate,
    Write(String),
}

/// Producer-side handle. Cheap to clone; one per reader.
#[derive(Debug, Clone)]
pub struct SinkClient {
    requests: mpsc::Sender<SinkRequest>,
}

impl SinkClient {
    /// Close the current result file (if any) and open a new one.
    pub async fn rotate(&self) -> Result<(), SinkClosed> {
        self.requests.send(SinkRequest::Rotate).await.map_err(|_| SinkClosed)
    }

    /// Append `payload` (tag already stripped) to the current result file.
    pub async fn write(&self, payload: impl Into<String>) -> Result<(), SinkClosed> {
        self.requests
            .send(SinkRequest::Write(payload.into()))
            .await
            .map_err(|_| SinkClosed)
    }

    /// [`rotate`](Self::rotate) for use outside the runtime (reader threads).
    pub fn blocking_rotate(&self) -> Result<(), SinkClosed> {
        self.requests.blocking_send(SinkRequest::Rotate).map_err(|_| SinkClosed)
    }

    /// [`write`](Self::write) for use outside the runtime (reader threads).
    pub fn blocking_write(&self, payload: impl Into<String>) -> Result<(), SinkClosed> {
        self.requests
            .blocking_send(SinkRequest::Write(payload.into()))
            .map_err(|_| SinkClosed)
    }
}

/// Owner-side handle: hands out clients and drives shutdown.
#[derive(Debug)]
pub struct SinkHandle {
    client: SinkClient,
    stop: oneshot::Sender<()>,
    stopped: oneshot::Receiver<SinkSummary>,
    task: JoinHandle<()>,
}

impl SinkHandle {
    pub fn client(&self) -> SinkClient {
        self.client.clone()
    }

    /// Whether the sink task has ended (after a stop or a fatal error).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request a stop and wait for the acknowledgment.
    ///
    /// Every request queued before this call is still applied. Resolves once
    /// the open result file, if any, has been flushed and closed. Fails with
    /// [`BridgeError::SinkUnavailable`] if the task ended on a fatal error
    /// instead; that error has already been reported on the fatal channel.
    pub async fn shutdown(self) -> Result<SinkSummary, BridgeError> {
        let SinkHandle {
            client,
            stop,
            stopped,
            task: _,
        } = self;
        drop(client);
        // Dropping `stop` would be observed the same way.
        let _ = stop.send(());
        stopped.await.map_err(|_| BridgeError::SinkUnavailable)
    }
}

/// The sink task's state.
pub struct FileSink {
    config: SinkConfig,
    console: Console,
    clock: Arc<dyn Clock>,
    requests: mpsc::Receiver<SinkRequest>,
    current: Option<ResultFile>,
    summary: SinkSummary,
}

impl FileSink {
    /// Start the sink task on the current Tokio runtime.
    pub fn spawn(
        config: SinkConfig,
        console: Console,
        clock: Arc<dyn Clock>,
        fatal: FatalSender,
    ) -> SinkHandle {
        let (request_tx, request_rx) = mpsc::channel(config.queue_depth.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = oneshot::channel();

        let sink = FileSink {
            config,
            console,
            clock,
            requests: request_rx,
            current: None,
            summary: SinkSummary::default(),
        };
        let task = tokio::spawn(sink.run(stop_rx, stopped_tx, fatal));

        SinkHandle {
            client: SinkClient { requests: request_tx },
            stop: stop_tx,
            stopped: stopped_rx,
            task,
        }
    }

    async fn run(
        mut self,
        stop: oneshot::Receiver<()>,
        stopped: oneshot::Sender<SinkSummary>,
        fatal: FatalSender,
    ) {
        let outcome = match self.serve(stop).await {
            Ok(()) => self.close_current().await,
            Err(err) => {
                // Keep what was written so far; the first error wins.
                let _ = self.close_current().await;
                Err(err)
            }
        };

        match outcome {
            Ok(()) => {
                info!(
                    files = self.summary.files.len(),
                    records = self.summary.records_written,
                    "output file sink stopped"
                );
                let _ = stopped.send(self.summary);
            }
            Err(err) => report_fatal(&fatal, err),
        }
    }

    /// Process requests until a stop arrives, then drain what is queued.
    async fn serve(&mut self, mut stop: oneshot::Receiver<()>) -> Result<(), BridgeError> {
        let mut producers_open = true;
        loop {
            tokio::select! {
                request = self.requests.recv(), if producers_open => match request {
                    Some(request) => self.handle(request).await?,
                    None => {
                        debug!("all sink producers gone; waiting for stop");
                        producers_open = false;
                    }
                },
                _ = &mut stop => break,
            }
        }

        self.requests.close();
        while let Some(request) = self.requests.recv().await {
            self.handle(request).await?;
        }
        Ok(())
    }

    async fn handle(&mut self, request: SinkRequest) -> Result<(), BridgeError> {
        match request {
            SinkRequest::Rotate => self.rotate().await,
            SinkRequest::Write(payload) => self.write(payload).await,
        }
    }

    async fn rotate(&mut self) -> Result<(), BridgeError> {
        self.close_current().await?;

        let file = ResultFile::create(&self.config, self.clock.now()).await?;
        let name = file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.console
            .notice(format_args!("Opening new file for results: {name}"));
        info!(path = %file.path().display(), "result file opened");

        self.summary.files.push(file.path().to_path_buf());
        self.current = Some(file);
        Ok(())
    }

    async fn write(&mut self, payload: String) -> Result<(), BridgeError> {
        let Some(file) = self.current.as_mut() else {
            return Err(BridgeError::WriteBeforeRotation { payload });
        };
        file.append(&payload).await?;
        self.summary.records_written += 1;
        Ok(())
    }

    async fn close_current(&mut self) -> Result<(), BridgeError> {
        if let Some(file) = self.current.take() {
            let path = file.path().to_path_buf();
            let records = file.close().await?;
            debug!(path = %path.display(), records, "result file closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleCapture;
    use crate::error::{fatal_channel, FatalReceiver};
    use chrono::{DateTime, Duration, Local, TimeZone};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    /// Starts at 2024-01-01 00:00:00 and advances one second per reading.
    struct SteppingClock(Mutex<DateTime<Local>>);

    impl SteppingClock {
        fn new() -> Arc<Self> {
            let start = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            Arc::new(Self(Mutex::new(start)))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Local> {
            let mut now = self.0.lock();
            let current = *now;
            *now = current + Duration::seconds(1);
            current
        }
    }

    struct Harness {
        handle: SinkHandle,
        client: SinkClient,
        fatal: FatalReceiver,
        console: ConsoleCapture,
        dir: tempfile::TempDir,
    }

    fn start() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let (console, capture) = Console::capture();
        let (fatal_tx, fatal_rx) = fatal_channel();
        let config = SinkConfig {
            directory: dir.path().to_path_buf(),
            ..SinkConfig::default()
        };
        let handle = FileSink::spawn(config, console, SteppingClock::new(), fatal_tx);
        Harness {
            client: handle.client(),
            handle,
            fatal: fatal_rx,
            console: capture,
            dir,
        }
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_rotate_write_shutdown() {
        let h = start();
        h.client.rotate().await.unwrap();
        h.client.write("12.34").await.unwrap();
        assert!(!h.handle.is_finished());

        let summary = h.handle.shutdown().await.unwrap();

        let expected = h.dir.path().join("points-2024-01-01-00-00-00.asdp");
        assert_eq!(summary.files, vec![expected.clone()]);
        assert_eq!(summary.records_written, 1);
        assert_eq!(read(&expected), "12.34\n");
        assert_eq!(
            h.console.lines(),
            vec![">> Opening new file for results: points-2024-01-01-00-00-00.asdp"]
        );
    }

    #[tokio::test]
    async fn test_writes_land_in_latest_file() {
        let h = start();
        h.client.rotate().await.unwrap();
        h.client.write("a1").await.unwrap();
        h.client.write("a2").await.unwrap();
        h.client.rotate().await.unwrap();
        h.client.write("b1").await.unwrap();
        h.client.rotate().await.unwrap();

        let summary = h.handle.shutdown().await.unwrap();

        assert_eq!(summary.files.len(), 3);
        assert_eq!(read(&summary.files[0]), "a1\na2\n");
        assert_eq!(read(&summary.files[1]), "b1\n");
        assert_eq!(read(&summary.files[2]), "");
        assert_eq!(summary.records_written, 3);
    }

    #[tokio::test]
    async fn test_arrival_order_across_clients() {
        let h = start();
        let other = h.handle.client();
        h.client.rotate().await.unwrap();
        other.write("x").await.unwrap();
        h.client.rotate().await.unwrap();
        other.write("y").await.unwrap();

        let summary = h.handle.shutdown().await.unwrap();
        assert_eq!(read(&summary.files[0]), "x\n");
        assert_eq!(read(&summary.files[1]), "y\n");
    }

    #[tokio::test]
    async fn test_queued_writes_survive_shutdown() {
        let h = start();
        h.client.rotate().await.unwrap();
        for i in 0..50 {
            h.client.write(format!("{i}")).await.unwrap();
        }

        let summary = h.handle.shutdown().await.unwrap();

        let expected: String = (0..50).map(|i| format!("{i}\n")).collect();
        assert_eq!(read(&summary.files[0]), expected);
        assert_eq!(summary.records_written, 50);
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_are_refused() {
        let h = start();
        let client = h.client.clone();
        h.handle.shutdown().await.unwrap();

        assert_eq!(client.rotate().await, Err(SinkClosed));
        assert_eq!(client.write("late").await, Err(SinkClosed));
    }

    #[tokio::test]
    async fn test_shutdown_without_files() {
        let h = start();
        let summary = h.handle.shutdown().await.unwrap();
        assert_eq!(summary, SinkSummary::default());
        assert!(std::fs::read_dir(h.dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_write_before_rotation_is_fatal() {
        let mut h = start();
        h.client.write("12.34").await.unwrap();

        let err = h.fatal.recv().await.unwrap();
        assert!(matches!(
            err,
            BridgeError::WriteBeforeRotation { ref payload } if payload == "12.34"
        ));
        // The task ends on its own, without a stop request.
        let mut waited = 0;
        while !h.handle.is_finished() && waited < 100 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            waited += 1;
        }
        assert!(h.handle.is_finished());
        assert!(matches!(
            h.handle.shutdown().await,
            Err(BridgeError::SinkUnavailable)
        ));
        assert!(std::fs::read_dir(h.dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_file_creation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let (console, _capture) = Console::capture();
        let (fatal_tx, mut fatal_rx) = fatal_channel();
        let config = SinkConfig {
            directory: blocker,
            ..SinkConfig::default()
        };
        let handle = FileSink::spawn(config, console, SteppingClock::new(), fatal_tx);

        handle.client().rotate().await.unwrap();

        let err = fatal_rx.recv().await.unwrap();
        assert!(matches!(err, BridgeError::FileCreate { .. }));
    }

    #[test]
    fn test_blocking_client_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let h = runtime.block_on(async { start() });

        let client = h.client.clone();
        std::thread::spawn(move || {
            client.blocking_rotate().unwrap();
            client.blocking_write("7.5").unwrap();
        })
        .join()
        .unwrap();

        let summary = runtime.block_on(h.handle.shutdown()).unwrap();
        assert_eq!(read(&summary.files[0]), "7.5\n");
    }
}
