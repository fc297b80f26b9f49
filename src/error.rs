//! Error types for wsd.
//!
//! This module defines the fatal, pre-pipeline errors of the crate.
//! Errors raised inside the running pipeline are never propagated; they are
//! queued as [`TransportError`](crate::transport::TransportError) values and
//! reported by the error sink instead.
//!
//! # Usage
//!
//! All fallible setup operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wsd::{Config, Result, transport::dial};
//!
//! async fn example() -> Result<()> {
//!     let config = Config::builder()
//!         .url("wss://echo.example.com/ws")
//!         .header("Authorization: Bearer token")?
//!         .build()?;
//!     let connection = dial(&config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::MalformedHeader`] |
//! | Connection | [`Error::Handshake`], [`Error::Tls`], [`Error::SessionClosed`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Apart from [`Error::SessionClosed`], every variant is raised before the
/// pipeline starts and aborts startup.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the target URL, origin or another option is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Header argument without a `Name: Value` separator.
    ///
    /// Returned before any dial attempt.
    #[error("Malformed header: {header:?} (expected \"Name: Value\")")]
    MalformedHeader {
        /// The header argument as supplied.
        header: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket handshake failed.
    ///
    /// Covers DNS, TCP connect, TLS, HTTP upgrade and subprotocol
    /// negotiation failures.
    #[error("Handshake with {url} failed: {message}")]
    Handshake {
        /// Target URL of the failed dial.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// TLS client configuration could not be built.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The pipeline has shut down and no longer accepts messages.
    #[error("Session closed")]
    SessionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a malformed header error.
    #[inline]
    pub fn malformed_header(header: impl Into<String>) -> Self {
        Self::MalformedHeader {
            header: header.into(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Handshake {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the error was raised while validating configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::MalformedHeader { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Handshake { .. } | Self::Tls(_) | Self::SessionClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
