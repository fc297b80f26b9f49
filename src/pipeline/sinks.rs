//! Message and error sinks.
//!
//! Each sink drains one queue in arrival order and prints through the
//! shared [`Terminal`]. The error sink is the only place that ends a
//! session.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::TransientPolicy;
use crate::terminal::Terminal;
use crate::transport::{ErrorKind, TransportError};

use super::session::Outcome;

// ============================================================================
// Message Sink
// ============================================================================

/// Prints inbound messages until the session is cancelled.
///
/// Messages already queued when the session ends are still printed, so a
/// final message sent just before a close is not lost.
pub(super) async fn run_message_sink(
    mut inbound: UnboundedReceiver<Vec<u8>>,
    terminal: Terminal,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            message = inbound.recv() => message,
        };

        match message {
            Some(message) => terminal.inbound(&message),
            None => break,
        }
    }

    let mut drained = 0usize;
    while let Ok(message) = inbound.try_recv() {
        terminal.inbound(&message);
        drained += 1;
    }

    debug!(drained, "Message sink terminated");
}

// ============================================================================
// Error Sink
// ============================================================================

/// Reports transport errors and decides when the session ends.
///
/// - End-of-stream: prints the close notice, resolves [`Outcome::RemoteClosed`]
/// - Fatal: prints the cause, resolves [`Outcome::Failed`]
/// - Transient: prints a warning, then ends with [`Outcome::GaveUp`] only if
///   the policy says so
///
/// Cancels `shutdown` before returning so every other loop stops.
pub(super) async fn run_error_sink(
    mut errors: UnboundedReceiver<TransportError>,
    terminal: Terminal,
    policy: TransientPolicy,
    shutdown: CancellationToken,
) -> Outcome {
    let outcome = loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break Outcome::Interrupted,
            next = errors.recv() => next,
        };

        let Some(err) = next else {
            break Outcome::Interrupted;
        };

        match err.kind() {
            ErrorKind::EndOfStream => {
                info!(error = %err, direction = %err.direction(), "Connection closed by remote");
                terminal.remote_closed(&err);
                break Outcome::RemoteClosed;
            }
            ErrorKind::Fatal => {
                error!(error = %err, direction = %err.direction(), "Connection unreadable");
                terminal.stopped_reading(&err);
                break Outcome::Failed;
            }
            ErrorKind::Transient => {}
        }

        warn!(
            error = %err,
            direction = %err.direction(),
            consecutive = err.consecutive(),
            "Transport error"
        );
        terminal.transient(&err);

        if policy.gives_up_after(err.consecutive()) {
            terminal.gave_up(err.consecutive());
            break Outcome::GaveUp;
        }
    };

    shutdown.cancel();
    debug!(?outcome, "Error sink terminated");
    outcome
}

// ============================================================================
// Tests
// ============================================================================
