//! Shutdown coordination.
//!
//! One-shot state machine: `Running -> StopRequested -> Stopped`. A termination
//! signal moves it forward and drives the sink's two-phase stop. A fatal report
//! from any task short-circuits it with that error.

use crate::console::Console;
use crate::error::{BridgeError, FatalReceiver};
use crate::sink::{SinkHandle, SinkSummary};
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Signals that start an orderly shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("interrupt"),
            Self::Terminate => f.write_str("terminated"),
        }
    }
}

/// Installed termination signal handlers.
///
/// Handlers are registered by [`install`](Self::install), not on the first
/// poll, so a signal delivered between the two is still seen by [`recv`](Self::recv).
#[derive(Debug)]
pub struct TerminationListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationListener {
    /// Register SIGINT and (on Unix) SIGTERM. Must be called inside a Tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination signal.
    pub async fn recv(&mut self) -> std::io::Result<TerminationSignal> {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => Ok(TerminationSignal::Interrupt),
                _ = self.terminate.recv() => Ok(TerminationSignal::Terminate),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok(TerminationSignal::Interrupt)
        }
    }
}

/// Coordinator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    StopRequested,
    Stopped,
}

impl ShutdownState {
    /// Next state, or `None` from the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Running => Some(Self::StopRequested),
            Self::StopRequested => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }
}

/// Drives the bridge from running to stopped.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: ShutdownState,
    console: Console,
}

impl ShutdownCoordinator {
    pub fn new(console: Console) -> Self {
        Self {
            state: ShutdownState::Running,
            console,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            info!(from = ?self.state, to = ?next, "shutdown state");
            self.state = next;
        }
    }

    /// Run until `signal` fires (orderly stop) or a task reports a fatal error.
    ///
    /// On a signal, the sink is asked to stop and the coordinator waits for
    /// its acknowledgment before returning the sink's summary. The readers are
    /// left blocked in their reads; process exit reclaims them.
    pub async fn run<S>(
        mut self,
        signal: S,
        sink: SinkHandle,
        mut fatal: FatalReceiver,
    ) -> Result<SinkSummary, BridgeError>
    where
        S: Future<Output = std::io::Result<TerminationSignal>>,
    {
        tokio::select! {
            received = signal => {
                let received = received.map_err(BridgeError::Signal)?;
                self.console.notice(format_args!("received {received}, shutting down"));
                info!(signal = %received, "termination signal received");
            }
            Some(err) = fatal.recv() => return Err(err),
        }

        self.advance();
        let outcome = sink.shutdown().await;

        match outcome {
            Ok(summary) => {
                self.advance();
                self.console.notice("exiting");
                Ok(summary)
            }
            Err(err) => {
                // The sink reports the real cause before dropping its ack.
                let cause = fatal.try_recv().unwrap_or(err);
                warn!(error = %cause, "sink failed while stopping");
                Err(cause)
            }
        }
    }
}
