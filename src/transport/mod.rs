//! WebSocket transport layer.
//!
//! This module dials the remote endpoint and exposes the resulting
//! connection as two independent halves that the pipeline drives from
//! separate tasks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  wsd            │         WebSocket            │  Remote         │
//! │                 │                              │  server         │
//! │  WsReader  ◄────┼──────────────────────────────┤                 │
//! │  WsWriter  ─────┼─────────────────────────────►│                 │
//! └─────────────────┘       ws:// or wss://        └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`dial`] - Handshake using a [`Config`](crate::Config)
//! 2. [`Connection::split`] - Separate read and write halves
//! 3. Reader/writer loops call [`TransportRead::recv`] / [`TransportWrite::send`]
//! 4. [`TransportWrite::close`] - Close once on shutdown
//!
//! Both halves share the underlying stream through a `BiLock`, so one
//! task may block in `recv` while another sends.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection halves and error classification |
//! | `connector` | Handshake request construction and dialing |
//! | `tls` | Certificate verification policy |

// ============================================================================
// Submodules
// ============================================================================

/// Connection halves and error classification.
pub mod connection;

/// Handshake request construction and dialing.
pub mod connector;

/// TLS client configuration.
pub mod tls;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, WsReader, WsWriter};
pub use connector::{build_request, dial};

// ============================================================================
// TransportError
// ============================================================================

/// Whether the remote can still deliver data after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote closed the connection; nothing more will arrive.
    EndOfStream,
    /// A read or write failed but the connection may still be usable.
    Transient,
    /// An earlier local failure left the connection unreadable.
    ///
    /// The remote may still be connected, but nothing more can be received.
    Fatal,
}

/// Which loop an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reader loop.
    Read,
    /// Writer loop.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// A failed receive or send.
///
/// Transport errors never propagate out of the loop that hit them. They are
/// queued and reported by the error sink, which alone decides whether the
/// session ends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: ErrorKind,
    direction: Direction,
    message: String,
    consecutive: u32,
}

impl TransportError {
    /// Creates an error of the given kind.
    #[inline]
    pub fn new(kind: ErrorKind, direction: Direction, message: impl Into<String>) -> Self {
        Self {
            kind,
            direction,
            message: message.into(),
            consecutive: 1,
        }
    }

    /// Creates an end-of-stream error.
    #[inline]
    pub fn end_of_stream(direction: Direction, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EndOfStream, direction, message)
    }

    /// Creates a transient error.
    #[inline]
    pub fn transient(direction: Direction, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, direction, message)
    }

    /// Creates an error for a connection that a local failure broke.
    #[inline]
    pub fn fatal(direction: Direction, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, direction, message)
    }

    /// Records how many failures in a row the originating loop has seen.
    #[inline]
    #[must_use]
    pub fn with_consecutive(mut self, consecutive: u32) -> Self {
        self.consecutive = consecutive;
        self
    }

    /// Error kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Loop the error came from.
    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Failures in a row in the originating loop, this one included.
    #[inline]
    #[must_use]
    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Returns `true` if the remote closed the connection.
    #[inline]
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        self.kind == ErrorKind::EndOfStream
    }

    /// Returns `true` if nothing more can be received, whoever caused it.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ErrorKind::EndOfStream | ErrorKind::Fatal)
    }
}

// ============================================================================
// Transport Traits
// ============================================================================

/// Receiving half of a message transport.
#[async_trait]
pub trait TransportRead: Send + 'static {
    /// Receives the next data message.
    ///
    /// Control frames are handled by the transport and never returned.
    async fn recv(&mut self) -> StdResult<Vec<u8>, TransportError>;
}

/// Sending half of a message transport.
#[async_trait]
pub trait TransportWrite: Send + 'static {
    /// Sends one message.
    async fn send(&mut self, payload: Vec<u8>) -> StdResult<(), TransportError>;

    /// Closes the connection. Calls after the first are no-ops.
    async fn close(&mut self);
}

// ============================================================================
// Tests
// ============================================================================
