//! Command-line interface.
//!
//! Parses flags with `clap` and turns them into a [`Config`]. Header
//! arguments are validated here, before any connection attempt.

// ============================================================================
// Imports
// ============================================================================

use clap::{Parser, ValueEnum};

use crate::config::policy::{DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF, DEFAULT_THRESHOLD};
use crate::config::{Config, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_ORIGIN, DEFAULT_URL, TransientPolicy};
use crate::error::Result;

// ============================================================================
// Cli
// ============================================================================

/// Interactive WebSocket client.
///
/// Type a line to send it; inbound messages are printed as they arrive.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsd", author, version, about, long_about = None)]
pub struct Cli {
    /// WebSocket server address to connect to.
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Origin of the WebSocket client.
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// WebSocket subprotocol to request.
    #[arg(long, default_value = "")]
    pub protocol: String,

    /// Skip TLS certificate verification.
    #[arg(long, alias = "insecureSkipVerify")]
    pub insecure_skip_verify: bool,

    /// Custom header `Name: Value`. May be repeated.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Largest inbound message accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// What to do about repeated transport errors.
    #[arg(long, value_enum, default_value_t = OnTransient::Backoff)]
    pub on_transient: OnTransient,

    /// Consecutive transport errors before backing off or exiting.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub transient_threshold: u32,
}

/// `--on-transient` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnTransient {
    /// Report and retry immediately, forever.
    Retry,
    /// Report and retry with exponential backoff.
    Backoff,
    /// Report, then exit once the threshold is reached.
    Exit,
}

impl Cli {
    /// Transient policy selected by the flags.
    #[must_use]
    pub fn transient_policy(&self) -> TransientPolicy {
        match self.on_transient {
            OnTransient::Retry => TransientPolicy::Retry,
            OnTransient::Backoff => TransientPolicy::Backoff {
                threshold: self.transient_threshold,
                initial: DEFAULT_INITIAL_BACKOFF,
                max: DEFAULT_MAX_BACKOFF,
            },
            OnTransient::Exit => TransientPolicy::Exit {
                threshold: self.transient_threshold,
            },
        }
    }

    /// Builds the connection configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedHeader`](crate::Error::MalformedHeader) for a header without a colon
    /// - [`Error::Config`](crate::Error::Config) for an invalid URL or origin
    pub fn into_config(self) -> Result<Config> {
        let policy = self.transient_policy();

        Config::builder()
            .headers(&self.headers)?
            .url(self.url)
            .origin(self.origin)
            .protocol(self.protocol)
            .insecure_skip_verify(self.insecure_skip_verify)
            .max_message_size(self.max_message_size)
            .transient_policy(policy)
            .build()
    }
}

// ============================================================================
// Tests
// ============================================================================
