//! WebSocket connection halves.
//!
//! A [`Connection`] is split into a [`WsReader`] and a [`WsWriter`] that
//! implement the transport traits for the reader and writer loops.
//!
//! # Message Mapping
//!
//! - Text and binary frames are delivered as raw bytes
//! - Ping, pong and raw frames are consumed internally
//! - A close frame or the end of the stream is [`ErrorKind::EndOfStream`]
//! - Any other read error ends the underlying stream too, so it is reported
//!   once as transient and every later receive fails with
//!   [`ErrorKind::Fatal`] carrying the same cause. An oversized inbound
//!   message is such an error: the connection cannot be read past it.
//! - Outbound payloads that are valid UTF-8 go out as text frames,
//!   anything else as binary frames

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::result::Result as StdResult;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::{CapacityError, ProtocolError};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{Direction, ErrorKind, TransportError, TransportRead, TransportWrite};

// ============================================================================
// Connection
// ============================================================================

/// An open WebSocket connection to one remote endpoint.
///
/// Exactly one exists per session. It is consumed by [`split`](Self::split)
/// and closed by the writer half.
pub struct Connection<S = MaybeTlsStream<TcpStream>> {
    /// Upgraded stream.
    stream: WebSocketStream<S>,
    /// Subprotocol accepted by the server.
    protocol: Option<String>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an upgraded stream.
    #[inline]
    pub fn new(stream: WebSocketStream<S>, protocol: Option<String>) -> Self {
        Self { stream, protocol }
    }

    /// Subprotocol accepted by the server, if any.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Splits the connection into independently driven halves.
    pub fn split(self) -> (WsReader<S>, WsWriter<S>) {
        let (sink, stream) = self.stream.split();
        (
            WsReader {
                stream,
                broken: None,
            },
            WsWriter {
                sink,
                closed: false,
            },
        )
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WsReader
// ============================================================================

/// Receiving half of a [`Connection`].
pub struct WsReader<S = MaybeTlsStream<TcpStream>> {
    stream: SplitStream<WebSocketStream<S>>,
    /// Cause of the local error that ended the stream.
    broken: Option<String>,
}

#[async_trait]
impl<S> TransportRead for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> StdResult<Vec<u8>, TransportError> {
        if let Some(cause) = &self.broken {
            return Err(TransportError::fatal(Direction::Read, cause.clone()));
        }

        loop {
            match self.stream.next().await {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    return Ok(message.into_data().to_vec());
                }

                Some(Ok(Message::Close(frame))) => {
                    let message = match frame {
                        Some(frame) if frame.reason.is_empty() => format!("close {}", frame.code),
                        Some(frame) => format!("close {}: {}", frame.code, frame.reason),
                        None => "close".to_string(),
                    };
                    debug!(%message, "WebSocket closed by remote");
                    return Err(TransportError::end_of_stream(Direction::Read, message));
                }

                Some(Err(e)) => {
                    let err = classify(Direction::Read, &e);
                    if !err.is_end_of_stream() {
                        // The stream yields nothing after an error.
                        debug!(error = %err, "WebSocket stream unreadable");
                        self.broken = Some(err.to_string());
                    }
                    return Err(err);
                }

                None => {
                    debug!("WebSocket stream ended");
                    return Err(TransportError::end_of_stream(Direction::Read, "EOF"));
                }

                // Ping, Pong and raw frames
                Some(Ok(other)) => trace!(?other, "Control frame"),
            }
        }
    }
}

// ============================================================================
// WsWriter
// ============================================================================

/// Sending half of a [`Connection`].
pub struct WsWriter<S = MaybeTlsStream<TcpStream>> {
    sink: SplitSink<WebSocketStream<S>, Message>,
    closed: bool,
}

#[async_trait]
impl<S> TransportWrite for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, payload: Vec<u8>) -> StdResult<(), TransportError> {
        let message = match String::from_utf8(payload) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };

        self.sink
            .send(message)
            .await
            .map_err(|e| classify(Direction::Write, &e))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.sink.close().await {
            Ok(()) => debug!("WebSocket closed"),
            Err(e) => debug!(error = %e, "WebSocket close failed"),
        }
    }
}

// ============================================================================
// Error Classification
// ============================================================================

/// Maps a WebSocket error to a [`TransportError`].
///
/// Anything that means the remote is gone is end-of-stream; everything
/// else, oversized messages included, is transient.
pub(crate) fn classify(direction: Direction, err: &WsError) -> TransportError {
    let kind = match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => ErrorKind::EndOfStream,

        WsError::Io(io) => match io.kind() {
            IoErrorKind::UnexpectedEof
            | IoErrorKind::ConnectionReset
            | IoErrorKind::ConnectionAborted
            | IoErrorKind::BrokenPipe => ErrorKind::EndOfStream,
            _ => ErrorKind::Transient,
        },

        _ => ErrorKind::Transient,
    };

    let message = match err {
        WsError::Capacity(CapacityError::MessageTooLong { .. }) => {
            format!("inbound message exceeds the maximum message size ({err})")
        }
        _ => err.to_string(),
    };

    TransportError::new(kind, direction, message)
}

// ============================================================================
// Tests
// ============================================================================
