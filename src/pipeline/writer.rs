//! Writer loop.
//!
//! Sends queued outbound messages in order. A failed send is reported and
//! dropped; the loop moves on to the next message.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::TransientPolicy;
use crate::transport::{TransportError, TransportWrite};

use super::pause;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for the closing handshake on shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Writer Loop
// ============================================================================

/// Runs until the session is cancelled, then closes the connection.
///
/// The writer owns the only handle able to close the connection, so the
/// close happens exactly once.
pub(super) async fn run<W>(
    mut writer: W,
    mut outbound: UnboundedReceiver<Vec<u8>>,
    errors: UnboundedSender<TransportError>,
    policy: TransientPolicy,
    shutdown: CancellationToken,
) where
    W: TransportWrite,
{
    debug!("Writer loop started");
    let mut consecutive: u32 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = outbound.recv() => next,
        };

        let Some(payload) = next else {
            debug!("Outbound queue closed");
            shutdown.cancelled().await;
            break;
        };

        let len = payload.len();
        let sent = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            sent = writer.send(payload) => sent,
        };

        match sent {
            Ok(()) => {
                consecutive = 0;
                trace!(len, "Message sent");
            }

            Err(err) => {
                consecutive = consecutive.saturating_add(1);
                if errors.send(err.with_consecutive(consecutive)).is_err() {
                    debug!("Error queue closed");
                    break;
                }

                if let Some(delay) = policy.delay_after(consecutive) {
                    trace!(?delay, consecutive, "Backing off before next send");
                    if !pause(delay, &shutdown).await {
                        break;
                    }
                }
            }
        }
    }

    outbound.close();
    if timeout(CLOSE_TIMEOUT, writer.close()).await.is_err() {
        warn!(
            timeout_ms = CLOSE_TIMEOUT.as_millis() as u64,
            "Timed out closing connection"
        );
    }

    debug!("Writer loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
