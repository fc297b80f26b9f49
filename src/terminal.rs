//! Shared terminal output.
//!
//! The message sink, the error sink and the input loop all print to the
//! same terminal. Every write takes one lock, so a line from one never
//! lands in the middle of a line from another.
//!
//! Standard output is colored: addresses in the banners, inbound messages,
//! errors and close notices each get their own color. Colors follow the
//! `colored` crate's environment handling (`NO_COLOR`, `CLICOLOR_FORCE`).

// ============================================================================
// Imports
// ============================================================================

use std::fmt::{Arguments, Display};
use std::io::{self, Write};
use std::sync::Arc;

use colored::{Color, Colorize};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::transport::TransportError;

// ============================================================================
// Constants
// ============================================================================

/// Interactive prompt.
pub const PROMPT: &str = "> ";

// ============================================================================
// Terminal
// ============================================================================

/// Cloneable handle to the single output stream.
#[derive(Clone)]
pub struct Terminal {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
    color: bool,
}

impl Terminal {
    /// Colored terminal writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::colored(io::stdout())
    }

    /// Plain terminal writing to an arbitrary sink.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self::with_color(out, false)
    }

    /// Colored terminal writing to an arbitrary sink.
    pub fn colored(out: impl Write + Send + 'static) -> Self {
        Self::with_color(out, true)
    }

    fn with_color(out: impl Write + Send + 'static, color: bool) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            color,
        }
    }

    /// Renders `text` in `color` when this terminal is colored.
    fn paint(&self, text: impl Display, color: Color) -> String {
        if self.color {
            text.to_string().color(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Writes and flushes under the lock.
    fn emit(&self, args: Arguments<'_>) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_fmt(args).and_then(|()| out.flush()) {
            debug!(error = %e, "Terminal write failed");
        }
    }

    /// Draws the prompt.
    pub fn prompt(&self) {
        self.emit(format_args!("{PROMPT}"));
    }

    /// Prints an inbound message and redraws the prompt.
    pub fn inbound(&self, message: &[u8]) {
        let message = self.paint(String::from_utf8_lossy(message), Color::Cyan);
        self.emit(format_args!("\r< {message}\n{PROMPT}"));
    }

    /// Prints a transient error inline and redraws the prompt.
    pub fn transient(&self, err: &TransportError) {
        let err = self.paint(err, Color::Red);
        self.emit(format_args!("\rerr {err}\n{PROMPT}"));
    }

    /// Prints the remote close notice.
    pub fn remote_closed(&self, err: &TransportError) {
        let err = self.paint(err, Color::Magenta);
        self.emit(format_args!("\r✝ {err} - connection closed by remote\n"));
    }

    /// Prints the notice for a connection a local error made unreadable.
    pub fn stopped_reading(&self, err: &TransportError) {
        let err = self.paint(err, Color::Red);
        self.emit(format_args!("\r✝ {err} - stopped reading\n"));
    }

    /// Prints the notice for a session ended by the transient policy.
    pub fn gave_up(&self, consecutive: u32) {
        self.emit(format_args!(
            "\r✝ giving up after {consecutive} consecutive errors\n"
        ));
    }

    /// Prints the banner shown while dialing.
    pub fn connecting(&self, config: &Config) {
        let url = self.paint(config.url(), Color::Yellow);
        let origin = self.paint(config.origin(), Color::Yellow);

        match config.protocol() {
            Some(protocol) => {
                let protocol = self.paint(protocol, Color::Yellow);
                self.emit(format_args!(
                    "connecting to {url} via {protocol} from {origin}...\n"
                ));
            }
            None => self.emit(format_args!("connecting to {url} from {origin}...\n")),
        }
    }

    /// Prints the banner shown once the handshake succeeded.
    ///
    /// `negotiated` is the subprotocol the server accepted.
    pub fn connected(&self, config: &Config, negotiated: Option<&str>) {
        let url = self.paint(config.url(), Color::Green);

        match negotiated {
            Some(protocol) => {
                self.emit(format_args!("successfully connected to {url} ({protocol})\n\n"));
            }
            None => self.emit(format_args!("successfully connected to {url}\n\n")),
        }
    }
}

// ============================================================================
// Test Capture
// ============================================================================

/// In-memory terminal output for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub(crate) fn terminal(&self) -> Terminal {
        Terminal::new(self.clone())
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
