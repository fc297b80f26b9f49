//! Session lifecycle.
//!
//! A [`Session`] owns the three queues and the cancellation token, spawns
//! the reader, writer and sink tasks, and resolves to an [`Outcome`] once
//! the error sink ends it.
//!
//! # Example
//!
//! ```no_run
//! use wsd::{Config, Session, Terminal, transport::dial};
//!
//! # async fn example() -> wsd::Result<()> {
//! let config = Config::builder().url("ws://localhost:1337/ws").build()?;
//! let connection = dial(&config).await?;
//! let session = Session::attach(connection, Terminal::stdout(), config.transient_policy());
//!
//! session.outbox().send("hello")?;
//! let outcome = session.wait().await;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::future::join_all;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::TransientPolicy;
use crate::terminal::Terminal;
use crate::transport::{Connection, TransportRead, TransportWrite};

use super::{Outbox, reader, sinks, writer};

// ============================================================================
// Constants
// ============================================================================

/// How long stopped loops get to finish their cleanup.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

// ============================================================================
// Outcome
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote closed the connection.
    RemoteClosed,
    /// The transient policy gave up on a failing connection.
    GaveUp,
    /// A local error left the connection unreadable.
    Failed,
    /// The session was cancelled from outside (Ctrl-C).
    Interrupted,
}

impl Outcome {
    /// Process exit status for this outcome.
    #[inline]
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::RemoteClosed => 0,
            Self::GaveUp | Self::Failed => 1,
            Self::Interrupted => 130,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// A running pipeline around one connection.
pub struct Session {
    /// Producer side of the outbound queue.
    outbox: Outbox,
    /// Broadcast to every loop on shutdown.
    shutdown: CancellationToken,
    /// The error sink, which decides the outcome.
    error_sink: JoinHandle<Outcome>,
    /// Reader, writer and message sink.
    workers: Vec<JoinHandle<()>>,
}

impl Session {
    /// Splits `connection` and starts the pipeline around it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<S>(connection: Connection<S>, terminal: Terminal, policy: TransientPolicy) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = connection.split();
        Self::start(reader, writer, terminal, policy)
    }

    /// Starts the pipeline on arbitrary transport halves.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<R, W>(reader: R, writer: W, terminal: Terminal, policy: TransientPolicy) -> Self
    where
        R: TransportRead,
        W: TransportWrite,
    {
        let shutdown = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let workers = vec![
            tokio::spawn(reader::run(
                reader,
                inbound_tx,
                errors_tx.clone(),
                policy,
                shutdown.clone(),
            )),
            tokio::spawn(writer::run(
                writer,
                outbound_rx,
                errors_tx,
                policy,
                shutdown.clone(),
            )),
            tokio::spawn(sinks::run_message_sink(
                inbound_rx,
                terminal.clone(),
                shutdown.clone(),
            )),
        ];

        let error_sink = tokio::spawn(sinks::run_error_sink(
            errors_rx,
            terminal,
            policy,
            shutdown.clone(),
        ));

        debug!(?policy, "Session started");

        Self {
            outbox: Outbox::new(outbound_tx),
            shutdown,
            error_sink,
            workers,
        }
    }

    /// Producer handle for the outbound queue.
    #[inline]
    #[must_use]
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Token cancelled when the session ends.
    ///
    /// Cancelling it from outside ends the session with
    /// [`Outcome::Interrupted`].
    #[inline]
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Waits for the error sink to end the session, then stops every loop.
    ///
    /// Loops that have not finished their cleanup within the grace period
    /// are abandoned.
    pub async fn wait(self) -> Outcome {
        let Self {
            outbox,
            shutdown,
            error_sink,
            workers,
        } = self;

        let outcome = match error_sink.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Error sink failed");
                Outcome::GaveUp
            }
        };

        shutdown.cancel();
        drop(outbox);

        match timeout(SHUTDOWN_GRACE, join_all(workers)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Pipeline task failed");
                    }
                }
            }
            Err(_) => warn!(
                timeout_ms = SHUTDOWN_GRACE.as_millis() as u64,
                "Pipeline did not stop within grace period"
            ),
        }

        debug!(?outcome, "Session ended");
        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::pipeline::fakes::{RecordingWriter, ScriptedReader};
    use crate::terminal::Capture;
    use crate::transport::{Direction, TransportError};

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::RemoteClosed.exit_code(), 0);
        assert_eq!(Outcome::GaveUp.exit_code(), 1);
        assert_eq!(Outcome::Failed.exit_code(), 1);
        assert_eq!(Outcome::Interrupted.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_end_of_stream_ends_session_once() {
        let capture = Capture::default();
        let reader = ScriptedReader::new([
            Ok(b"before".to_vec()),
            Err(TransportError::transient(Direction::Read, "hiccup")),
            Err(TransportError::end_of_stream(Direction::Read, "EOF")),
        ]);
        let writer = RecordingWriter::default();

        let session = Session::start(
            reader,
            writer.clone(),
            capture.terminal(),
            TransientPolicy::Retry,
        );
        let token = session.shutdown_token();

        assert_eq!(session.wait().await, Outcome::RemoteClosed);
        assert!(token.is_cancelled());
        assert_eq!(writer.closes(), 1);
        assert!(capture.contents().contains("\r< before\n"));
        assert_eq!(
            capture
                .contents()
                .matches("connection closed by remote")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_typed_order_is_sent_order() {
        let reader = ScriptedReader::new([]);
        let writer = RecordingWriter::default();
        let session = Session::start(
            reader,
            writer.clone(),
            Capture::default().terminal(),
            TransientPolicy::Retry,
        );

        let outbox = session.outbox();
        let lines: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
        for line in &lines {
            outbox.send(line.as_str()).expect("queued");
        }

        while writer.sent().len() < lines.len() {
            tokio::task::yield_now().await;
        }

        let sent: Vec<String> = writer
            .sent()
            .into_iter()
            .map(|bytes| String::from_utf8(bytes).expect("utf8"))
            .collect();
        assert_eq!(sent, lines);

        session.shutdown_token().cancel();
        assert_eq!(session.wait().await, Outcome::Interrupted);
    }

    #[tokio::test]
    async fn test_outbox_rejects_after_shutdown() {
        let session = Session::start(
            ScriptedReader::new([]),
            RecordingWriter::default(),
            Capture::default().terminal(),
            TransientPolicy::Retry,
        );
        let outbox = session.outbox();

        session.shutdown_token().cancel();
        session.wait().await;

        assert!(outbox.send("too late").is_err());
    }

    #[tokio::test]
    async fn test_unreadable_connection_fails_session() {
        let capture = Capture::default();
        let reader = ScriptedReader::new([
            Err(TransportError::transient(Direction::Read, "too long")),
            Err(TransportError::fatal(Direction::Read, "too long")),
        ]);

        let session = Session::start(
            reader,
            RecordingWriter::default(),
            capture.terminal(),
            TransientPolicy::Retry,
        );

        assert_eq!(session.wait().await, Outcome::Failed);
        let output = capture.contents();
        assert!(output.contains("\rerr too long\n"));
        assert!(output.contains("✝ too long - stopped reading"));
        assert!(!output.contains("closed by remote"));
    }

    #[tokio::test]
    async fn test_writer_errors_reach_error_sink() {
        let capture = Capture::default();
        let writer = RecordingWriter::failing([
            TransportError::transient(Direction::Write, "w1"),
            TransportError::transient(Direction::Write, "w2"),
        ]);
        let session = Session::start(
            ScriptedReader::new([]),
            writer,
            capture.terminal(),
            TransientPolicy::Exit { threshold: 2 },
        );

        let outbox = session.outbox();
        outbox.send("a").expect("queued");
        outbox.send("b").expect("queued");

        assert_eq!(session.wait().await, Outcome::GaveUp);
        assert!(capture.contents().contains("err w1"));
        assert!(capture.contents().contains("err w2"));
    }
}
