//! Concurrent I/O pipeline.
//!
//! Five units of execution cooperate around one connection and three
//! queues:
//!
//! ```text
//!  stdin ──► input loop ──► outbound ──► writer ──► connection
//!  connection ──► reader ──┬─► inbound ──► message sink ──► terminal
//!                          └─► errors  ──► error sink   ──► terminal
//!  writer ─────────────────────► errors
//! ```
//!
//! The reader, writer and both sinks run as tokio tasks spawned by
//! [`Session::start`]. The input loop runs on the caller's task. Only the
//! error sink decides that the session is over; it cancels a shared
//! [`CancellationToken`] that every loop observes at its next await point.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `input` | Operator input loop |
//! | `reader` | Connection → inbound/error queues |
//! | `session` | Task spawning, shutdown and [`Outcome`] |
//! | `sinks` | Message and error sinks |
//! | `writer` | Outbound queue → connection |

// ============================================================================
// Submodules
// ============================================================================

/// Operator input loop.
pub mod input;

/// Reader loop.
mod reader;

/// Session lifecycle.
pub mod session;

/// Message and error sinks.
mod sinks;

/// Writer loop.
mod writer;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use input::{InputEnd, run_input};
pub use session::{Outcome, Session};

// ============================================================================
// Outbox
// ============================================================================

/// Producer handle for the outbound queue.
///
/// Messages are sent by the writer loop in the order they were queued.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Outbox {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Queues one outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] once the writer loop has stopped.
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.tx
            .send(payload.into())
            .map_err(|_| Error::SessionClosed)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sleeps for `delay` unless the session is cancelled first.
///
/// Returns `false` if cancelled.
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

// ============================================================================
// Test Doubles
// ============================================================================

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::transport::{TransportError, TransportRead, TransportWrite};

    /// Reader that replays a script, then blocks forever.
    pub(crate) struct ScriptedReader {
        script: VecDeque<Result<Vec<u8>, TransportError>>,
    }

    impl ScriptedReader {
        pub(crate) fn new(
            script: impl IntoIterator<Item = Result<Vec<u8>, TransportError>>,
        ) -> Self {
            Self {
                script: script.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl TransportRead for ScriptedReader {
        async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
            match self.script.pop_front() {
                Some(next) => next,
                None => std::future::pending().await,
            }
        }
    }

    /// Writer that records what it was asked to send.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingWriter {
        pub(crate) sent: Arc<Mutex<Vec<Vec<u8>>>>,
        pub(crate) failures: Arc<Mutex<VecDeque<TransportError>>>,
        pub(crate) closes: Arc<Mutex<u32>>,
    }

    impl RecordingWriter {
        pub(crate) fn failing(errors: impl IntoIterator<Item = TransportError>) -> Self {
            let writer = Self::default();
            writer.failures.lock().extend(errors);
            writer
        }

        pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().clone()
        }

        pub(crate) fn closes(&self) -> u32 {
            *self.closes.lock()
        }
    }

    #[async_trait]
    impl TransportWrite for RecordingWriter {
        async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
            if let Some(err) = self.failures.lock().pop_front() {
                return Err(err);
            }
            self.sent.lock().push(payload);
            Ok(())
        }

        async fn close(&mut self) {
            *self.closes.lock() += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
