//! What to do about consecutive transient errors.
//!
//! A transport that keeps failing would otherwise make the reader and
//! writer loops report errors in a tight loop. The policy lets the loops
//! back off, or lets the error sink end the session.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Consecutive failures tolerated before the policy kicks in.
pub const DEFAULT_THRESHOLD: u32 = 3;

/// First backoff delay.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound for a single backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

// ============================================================================
// TransientPolicy
// ============================================================================

/// Reaction to a run of consecutive transient errors in one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientPolicy {
    /// Report every error and try again immediately, forever.
    Retry,

    /// Report every error; after `threshold` consecutive failures, sleep
    /// with exponentially growing delay before the next attempt.
    Backoff {
        /// Consecutive failures before the first delay.
        threshold: u32,
        /// Delay applied at the threshold.
        initial: Duration,
        /// Cap for every delay.
        max: Duration,
    },

    /// End the session once a loop reports `threshold` consecutive failures.
    Exit {
        /// Consecutive failures that end the session.
        threshold: u32,
    },
}

impl Default for TransientPolicy {
    fn default() -> Self {
        Self::backoff(DEFAULT_THRESHOLD)
    }
}

impl TransientPolicy {
    /// Backoff policy with the default delays.
    #[inline]
    #[must_use]
    pub const fn backoff(threshold: u32) -> Self {
        Self::Backoff {
            threshold,
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }

    /// Delay a loop should wait after its `consecutive`-th failure in a row.
    ///
    /// `None` means retry immediately.
    #[must_use]
    pub fn delay_after(&self, consecutive: u32) -> Option<Duration> {
        match *self {
            Self::Backoff {
                threshold,
                initial,
                max,
            } if consecutive >= threshold.max(1) => {
                let exponent = (consecutive - threshold.max(1)).min(16);
                Some(initial.saturating_mul(1 << exponent).min(max))
            }
            _ => None,
        }
    }

    /// Returns `true` if the session should end after the
    /// `consecutive`-th failure in a row.
    #[inline]
    #[must_use]
    pub fn gives_up_after(&self, consecutive: u32) -> bool {
        matches!(*self, Self::Exit { threshold } if consecutive >= threshold.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
