//! WebSocket handshake.
//!
//! Turns a [`Config`] into a live [`Connection`].
//!
//! # Handshake Request
//!
//! 1. Base request from the target URL (Host, Upgrade, key, version)
//! 2. `Origin` from the configured origin
//! 3. `Sec-WebSocket-Protocol` only if a subprotocol is configured
//! 4. Every configured header appended in order, duplicates kept

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::connect_async_tls_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

use super::connection::Connection;
use super::tls;

// ============================================================================
// Public API
// ============================================================================

/// Performs the WebSocket handshake described by `config`.
///
/// # Errors
///
/// - [`Error::Handshake`] on DNS, connect, TLS, upgrade or subprotocol
///   negotiation failure, or if a header is not valid HTTP
/// - [`Error::Tls`] if the TLS client configuration cannot be built
pub async fn dial(config: &Config) -> Result<Connection> {
    let request = build_request(config)?;
    let connector = tls::connector(config.insecure_skip_verify())?;

    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size());
    ws_config.max_frame_size = Some(config.max_message_size());

    debug!(url = %config.url(), headers = config.headers().len(), "Dialing");

    let (stream, response) =
        connect_async_tls_with_config(request, Some(ws_config), false, Some(connector))
            .await
            .map_err(|e| Error::handshake(config.url().as_str(), e))?;

    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    info!(url = %config.url(), protocol = ?protocol, "WebSocket connection established");

    Ok(Connection::new(stream, protocol))
}

/// Builds the client handshake request for `config`.
///
/// # Errors
///
/// Returns [`Error::Handshake`] if the URL cannot form a request or a
/// header name or value is not valid HTTP.
pub fn build_request(config: &Config) -> Result<Request> {
    let url = config.url().as_str();
    let mut request = url
        .into_client_request()
        .map_err(|e| Error::handshake(url, e))?;

    let headers = request.headers_mut();

    let origin = HeaderValue::from_str(config.origin().as_str())
        .map_err(|e| Error::handshake(url, format!("invalid origin: {e}")))?;
    headers.insert(ORIGIN, origin);

    if let Some(protocol) = config.protocol() {
        let protocol = HeaderValue::from_str(protocol)
            .map_err(|e| Error::handshake(url, format!("invalid subprotocol: {e}")))?;
        headers.insert(SEC_WEBSOCKET_PROTOCOL, protocol);
    }

    for header in config.headers() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| {
            Error::handshake(url, format!("invalid header name {:?}: {e}", header.name))
        })?;
        let value = HeaderValue::from_str(&header.value).map_err(|e| {
            Error::handshake(url, format!("invalid value for header {:?}: {e}", header.name))
        })?;
        headers.append(name, value);
    }

    Ok(request)
}

// ============================================================================
// Tests
// ============================================================================
