//! wsd - Interactive WebSocket terminal client.
//!
//! This library connects to a WebSocket server, sends every line the
//! operator types as one message, and prints inbound messages as they
//! arrive.
//!
//! # Architecture
//!
//! The client is a small pipeline around one connection:
//!
//! - **Input loop**: Reads operator lines into the outbound queue
//! - **Writer loop**: Sends queued messages in order
//! - **Reader loop**: Pushes received messages into the inbound queue
//! - **Sinks**: Print inbound messages and report transport errors
//!
//! Key design principles:
//!
//! - Loops communicate only through unbounded queues
//! - A single cancellation token stops every loop
//! - The error sink alone decides when a session ends
//! - The connection is closed exactly once, by the writer loop
//!
//! # Quick Start
//!
//! ```no_run
//! use tokio::io::BufReader;
//! use wsd::{Config, Result, Session, Terminal, run_input, transport::dial};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::builder()
//!         .url("ws://localhost:1337/ws")
//!         .header("Authorization: Bearer token")?
//!         .build()?;
//!
//!     let terminal = Terminal::stdout();
//!     let connection = dial(&config).await?;
//!     let session = Session::attach(connection, terminal.clone(), config.transient_policy());
//!
//!     let outbox = session.outbox();
//!     let shutdown = session.shutdown_token();
//!     let stdin = BufReader::new(tokio::io::stdin());
//!
//!     let (_, outcome) = tokio::join!(
//!         run_input(stdin, &outbox, &terminal, &shutdown),
//!         session.wait(),
//!     );
//!     std::process::exit(outcome.exit_code());
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Command-line flags |
//! | [`config`] | Connection settings and [`TransientPolicy`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`pipeline`] | Session loops and queues |
//! | [`terminal`] | Operator-facing output |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Command-line flags.
///
/// Parsed with `clap` and converted with [`Cli::into_config`].
pub mod cli;

/// Connection settings.
///
/// Use [`Config::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Session pipeline.
///
/// - [`Session`] - Owns the loops around one connection
/// - [`Outbox`] - Producer handle for outbound messages
/// - [`run_input`] - Operator input loop
pub mod pipeline;

/// Operator-facing output.
pub mod terminal;

/// WebSocket transport layer.
///
/// Dialing, TLS policy, and the read/write halves of a connection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Cli types
pub use cli::{Cli, OnTransient};

// Config types
pub use config::{Config, ConfigBuilder, Header, TransientPolicy};

// Error types
pub use error::{Error, Result};

// Pipeline types
pub use pipeline::{InputEnd, Outbox, Outcome, Session, run_input};

// Terminal types
pub use terminal::Terminal;

// Transport types
pub use transport::{Connection, TransportError};
