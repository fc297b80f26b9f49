//! Builder pattern for connection configuration.
//!
//! Provides a fluent API for assembling a validated, immutable [`Config`].
//!
//! # Example
//!
//! ```
//! use wsd::Config;
//!
//! # fn example() -> wsd::Result<()> {
//! let config = Config::builder()
//!     .url("wss://echo.example.com/ws")
//!     .origin("https://example.com/")
//!     .protocol("chat")
//!     .header("A: 1")?
//!     .header("B: 2")?
//!     .build()?;
//!
//! assert_eq!(config.headers().len(), 2);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

use super::header::Header;
use super::policy::TransientPolicy;
use super::{Config, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_ORIGIN, DEFAULT_URL};

// ============================================================================
// ConfigBuilder
// ============================================================================

/// Builder for a [`Config`].
///
/// Use [`Config::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    /// Target WebSocket URL.
    url: String,
    /// Origin sent with the handshake.
    origin: String,
    /// Requested subprotocol, empty for none.
    protocol: String,
    /// Accept any server certificate.
    insecure_skip_verify: bool,
    /// Extra handshake headers in supplied order.
    headers: Vec<Header>,
    /// Largest inbound message accepted.
    max_message_size: usize,
    /// Reaction to consecutive transient errors.
    transient_policy: TransientPolicy,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            protocol: String::new(),
            insecure_skip_verify: false,
            headers: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            transient_policy: TransientPolicy::default(),
        }
    }
}

// ============================================================================
// ConfigBuilder Implementation
// ============================================================================

impl ConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WebSocket server address (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the origin sent with the handshake.
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the subprotocol to request. Empty requests none.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Disables TLS certificate verification.
    #[inline]
    #[must_use]
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Parses a `"Name: Value"` string and appends it to the header list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the string has no colon.
    pub fn header(mut self, raw: &str) -> Result<Self> {
        self.headers.push(Header::parse(raw)?);
        Ok(self)
    }

    /// Parses every `"Name: Value"` string, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] for the first string without a colon.
    pub fn headers<I, S>(mut self, raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for header in raw {
            self.headers.push(Header::parse(header.as_ref())?);
        }
        Ok(self)
    }

    /// Appends an already parsed header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Sets the largest inbound message accepted.
    #[inline]
    #[must_use]
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Sets the reaction to consecutive transient errors.
    #[inline]
    #[must_use]
    pub fn transient_policy(mut self, policy: TransientPolicy) -> Self {
        self.transient_policy = policy;
        self
    }

    /// Validates the settings and freezes them into a [`Config`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is not a `ws`/`wss` URL
    /// - [`Error::Config`] if the origin is not a valid URL
    /// - [`Error::Config`] if the maximum message size is zero
    pub fn build(self) -> Result<Config> {
        let url = self.validate_url()?;
        let origin = self.validate_origin()?;

        if self.max_message_size == 0 {
            return Err(Error::config("Maximum message size must be greater than zero"));
        }

        Ok(Config {
            url,
            origin,
            protocol: (!self.protocol.is_empty()).then_some(self.protocol),
            insecure_skip_verify: self.insecure_skip_verify,
            headers: self.headers,
            max_message_size: self.max_message_size,
            transient_policy: self.transient_policy,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConfigBuilder {
    /// Validates the target URL.
    fn validate_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::config(format!("Invalid url {:?}: {e}", self.url)))?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::config(format!(
                    "Unsupported url scheme {other:?}: expected \"ws\" or \"wss\""
                )));
            }
        }

        if url.host_str().is_none() {
            return Err(Error::config(format!("Url {:?} has no host", self.url)));
        }

        Ok(url)
    }

    /// Validates the origin.
    fn validate_origin(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| Error::config(format!("Invalid origin {:?}: {e}", self.origin)))
    }
}

// ============================================================================
// Tests
// ============================================================================
