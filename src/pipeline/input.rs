//! Operator input loop.
//!
//! Reads lines from the operator and queues each one as an outbound
//! message. Runs on the caller's task, normally the main task reading
//! standard input.

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::Result;
use crate::terminal::Terminal;

use super::Outbox;

// ============================================================================
// InputEnd
// ============================================================================

/// Why the input loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEnd {
    /// The input stream reached end-of-file.
    Exhausted,
    /// The session ended first.
    Cancelled,
}

// ============================================================================
// Input Loop
// ============================================================================

/// Queues every input line until input runs out or the session ends.
///
/// Lines are sent verbatim with the trailing `\n` or `\r\n` removed. The
/// prompt is drawn once up front and again after every line.
///
/// Running out of input does not end the session.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if reading input fails.
pub async fn run_input<I>(
    mut input: I,
    outbox: &Outbox,
    terminal: &Terminal,
    shutdown: &CancellationToken,
) -> Result<InputEnd>
where
    I: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    terminal.prompt();

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(InputEnd::Cancelled),
            read = input.read_until(b'\n', &mut line) => read?,
        };

        if read == 0 {
            debug!("Input exhausted");
            return Ok(InputEnd::Exhausted);
        }

        strip_line_ending(&mut line);
        trace!(len = line.len(), "Line queued");

        if outbox.send(line.clone()).is_err() {
            return Ok(InputEnd::Cancelled);
        }
        terminal.prompt();
    }
}

/// Removes one trailing `\n` or `\r\n`.
fn strip_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
