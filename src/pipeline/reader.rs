//! Reader loop.
//!
//! Receives from the connection forever: data goes to the inbound queue,
//! failures go to the error queue. The loop never ends itself on error.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::TransientPolicy;
use crate::transport::{TransportError, TransportRead};

use super::pause;

// ============================================================================
// Reader Loop
// ============================================================================

/// Runs until the session is cancelled.
///
/// After end-of-stream, or a fatal error that left the connection
/// unreadable, nothing more can arrive, so the loop parks until
/// cancellation instead of polling a finished stream.
pub(super) async fn run<R>(
    mut reader: R,
    inbound: UnboundedSender<Vec<u8>>,
    errors: UnboundedSender<TransportError>,
    policy: TransientPolicy,
    shutdown: CancellationToken,
) where
    R: TransportRead,
{
    debug!("Reader loop started");
    let mut consecutive: u32 = 0;

    loop {
        let received = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            received = reader.recv() => received,
        };

        match received {
            Ok(payload) => {
                consecutive = 0;
                trace!(len = payload.len(), "Message received");
                if inbound.send(payload).is_err() {
                    debug!("Inbound queue closed");
                    break;
                }
            }

            Err(err) => {
                consecutive = consecutive.saturating_add(1);
                let terminal = err.is_terminal();

                if errors.send(err.with_consecutive(consecutive)).is_err() {
                    debug!("Error queue closed");
                    break;
                }

                if terminal {
                    shutdown.cancelled().await;
                    break;
                }

                if let Some(delay) = policy.delay_after(consecutive) {
                    trace!(?delay, consecutive, "Backing off before next receive");
                    if !pause(delay, &shutdown).await {
                        break;
                    }
                }
            }
        }
    }

    debug!("Reader loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
