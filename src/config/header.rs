//! Extra handshake headers.
//!
//! Headers are supplied on the command line as `"Name: Value"` strings and
//! merged into the handshake request in the order given.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ============================================================================
// Header
// ============================================================================

/// A single `{name, value}` pair added to the handshake request.
///
/// Duplicates are allowed; a [`Config`](super::Config) keeps every pair in
/// the order it was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name, surrounding whitespace removed.
    pub name: String,
    /// Header value, surrounding whitespace removed.
    pub value: String,
}

impl Header {
    /// Creates a header from an already split name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses a `"Name: Value"` string.
    ///
    /// Splits on the first colon only, so values may contain colons
    /// (`"Referer: http://x"`). Both halves are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the string has no colon.
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| Error::malformed_header(raw))?;

        Ok(Self::new(name.trim(), value.trim()))
    }
}

impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

// ============================================================================
// Tests
// ============================================================================
