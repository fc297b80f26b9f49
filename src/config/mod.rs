//! Connection configuration.
//!
//! A [`Config`] is built once at startup and passed by reference into the
//! connector and the pipeline. It never changes afterwards.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Config`] | Immutable connection settings |
//! | [`ConfigBuilder`] | Fluent, validating builder |
//! | [`Header`] | Extra handshake header |
//! | [`TransientPolicy`] | Reaction to repeated transport errors |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for [`Config`].
pub mod builder;

/// Handshake header parsing.
pub mod header;

/// Transient error policy.
pub mod policy;

// ============================================================================
// Imports
// ============================================================================

use url::Url;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConfigBuilder;
pub use header::Header;
pub use policy::TransientPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Server address used when none is given.
pub const DEFAULT_URL: &str = "ws://localhost:1337/ws";

/// Origin used when none is given.
pub const DEFAULT_ORIGIN: &str = "http://localhost/";

/// Largest inbound message accepted by default (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

// ============================================================================
// Config
// ============================================================================

/// Immutable settings for one connection.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) url: Url,
    pub(crate) origin: Url,
    pub(crate) protocol: Option<String>,
    pub(crate) insecure_skip_verify: bool,
    pub(crate) headers: Vec<Header>,
    pub(crate) max_message_size: usize,
    pub(crate) transient_policy: TransientPolicy,
}

impl Config {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Target WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Origin sent with the handshake.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Requested subprotocol, if any.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Returns `true` if server certificates are not verified.
    #[inline]
    #[must_use]
    pub const fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }

    /// Extra handshake headers in supplied order.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Largest inbound message accepted, in bytes.
    #[inline]
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Reaction to consecutive transient errors.
    #[inline]
    #[must_use]
    pub const fn transient_policy(&self) -> TransientPolicy {
        self.transient_policy
    }
}
