//! End-to-end sessions against a loopback WebSocket server.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL};

use wsd::{Config, Error, InputEnd, Outcome, Session, Terminal, run_input, transport::dial};

const TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Helpers
// ============================================================================

/// Terminal output shared with the test.
#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    fn terminal(&self) -> Terminal {
        Terminal::new(self.clone())
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn bind() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}/ws", listener.local_addr()?);
    Ok((listener, url))
}

/// Accepts one client, recording its handshake headers.
///
/// A requested subprotocol is echoed back when `echo_protocol` is set.
async fn accept(
    listener: &TcpListener,
    echo_protocol: bool,
) -> Result<(HeaderMap, WebSocketStream<TcpStream>)> {
    let (stream, _) = listener.accept().await?;
    let mut seen = HeaderMap::new();

    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
            seen = request.headers().clone();
            if echo_protocol {
                if let Some(protocol) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
                    response
                        .headers_mut()
                        .insert(SEC_WEBSOCKET_PROTOCOL, protocol.clone());
                }
            }
            Ok(response)
        },
    )
    .await?;

    Ok((seen, ws))
}

fn values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Drains the server side until the client goes away.
async fn drain<S>(ws: &mut WebSocketStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(Ok(_)) = ws.next().await {}
}

/// TLS acceptor presenting a freshly generated self-signed certificate.
fn self_signed_acceptor() -> Result<TlsAcceptor> {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        certified.key_pair.serialize_der(),
    ));

    let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(vec![certified.cert.der().clone()], key)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Binds a `wss://localhost` endpoint that closes every session it accepts.
async fn spawn_tls_server() -> Result<(String, tokio::task::JoinHandle<Result<()>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("wss://localhost:{}/ws", listener.local_addr()?.port());
    let acceptor = self_signed_acceptor()?;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let tls = acceptor.accept(stream).await?;
        let mut ws = tokio_tungstenite::accept_async(tls).await?;
        ws.close(None).await?;
        drain(&mut ws).await;
        anyhow::Ok(())
    });

    Ok((url, server))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_headers_and_remote_close() -> Result<()> {
    let (listener, url) = bind().await?;

    let server = tokio::spawn(async move {
        let (headers, mut ws) = accept(&listener, true).await?;
        let first = ws.next().await.context("client message")??;
        ws.close(None).await?;
        drain(&mut ws).await;
        anyhow::Ok((headers, first))
    });

    let config = Config::builder()
        .url(url)
        .protocol("chat")
        .header("A: 1")?
        .header("B: 2")?
        .header("A: 3")?
        .build()?;

    let connection = timeout(TIMEOUT, dial(&config)).await??;
    assert_eq!(connection.protocol(), Some("chat"));

    let output = SharedOutput::default();
    let session = Session::attach(connection, output.terminal(), config.transient_policy());
    session.outbox().send("hello")?;

    let outcome = timeout(TIMEOUT, session.wait()).await?;
    assert_eq!(outcome, Outcome::RemoteClosed);
    assert!(output.contents().contains("connection closed by remote"));

    let (headers, first) = timeout(TIMEOUT, server).await???;
    assert_eq!(values(&headers, "a"), vec!["1", "3"]);
    assert_eq!(values(&headers, "b"), vec!["2"]);
    assert_eq!(values(&headers, ORIGIN.as_str()), vec!["http://localhost/"]);
    assert_eq!(values(&headers, SEC_WEBSOCKET_PROTOCOL.as_str()), vec!["chat"]);
    assert_eq!(first.into_data().as_ref(), b"hello");

    Ok(())
}

#[tokio::test]
async fn test_inbound_message_printed_without_subprotocol() -> Result<()> {
    let (listener, url) = bind().await?;

    let server = tokio::spawn(async move {
        let (headers, mut ws) = accept(&listener, false).await?;
        ws.send(Message::text("welcome")).await?;
        drain(&mut ws).await;
        anyhow::Ok(headers)
    });

    let config = Config::builder().url(url).build()?;
    let connection = timeout(TIMEOUT, dial(&config)).await??;
    assert_eq!(connection.protocol(), None);

    let output = SharedOutput::default();
    let session = Session::attach(connection, output.terminal(), config.transient_policy());

    timeout(TIMEOUT, async {
        while !output.contents().contains("< welcome") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    assert_eq!(output.contents(), "\r< welcome\n> ");

    session.shutdown_token().cancel();
    let outcome = timeout(TIMEOUT, session.wait()).await?;
    assert_eq!(outcome, Outcome::Interrupted);

    let headers = timeout(TIMEOUT, server).await???;
    assert!(headers.get(SEC_WEBSOCKET_PROTOCOL).is_none());

    Ok(())
}

#[tokio::test]
async fn test_typed_lines_arrive_in_order() -> Result<()> {
    let (listener, url) = bind().await?;

    let server = tokio::spawn(async move {
        let (_, mut ws) = accept(&listener, false).await?;
        let mut received = Vec::new();
        while received.len() < 3 {
            let message = ws.next().await.context("client message")??;
            received.push(message.into_text()?.as_str().to_owned());
        }
        ws.close(None).await?;
        drain(&mut ws).await;
        anyhow::Ok(received)
    });

    let config = Config::builder().url(url).build()?;
    let connection = timeout(TIMEOUT, dial(&config)).await??;

    let output = SharedOutput::default();
    let terminal = output.terminal();
    let session = Session::attach(connection, terminal.clone(), config.transient_policy());
    let outbox = session.outbox();
    let shutdown = session.shutdown_token();

    let input: &[u8] = b"one\r\ntwo\n{\"three\": 3}\n";
    let end = run_input(input, &outbox, &terminal, &shutdown).await?;
    assert_eq!(end, InputEnd::Exhausted);

    let outcome = timeout(TIMEOUT, session.wait()).await?;
    assert_eq!(outcome, Outcome::RemoteClosed);

    let received = timeout(TIMEOUT, server).await???;
    assert_eq!(received, vec!["one", "two", "{\"three\": 3}"]);

    Ok(())
}

#[tokio::test]
async fn test_dial_refused_is_connection_error() -> Result<()> {
    let (listener, url) = bind().await?;
    drop(listener);

    let config = Config::builder().url(url).build()?;
    let err = timeout(TIMEOUT, dial(&config))
        .await?
        .err()
        .context("dial should fail")?;
    assert!(err.is_connection_error());

    Ok(())
}

#[tokio::test]
async fn test_untrusted_certificate_fails_handshake() -> Result<()> {
    let (url, server) = spawn_tls_server().await?;

    let config = Config::builder().url(url).build()?;
    let err = timeout(TIMEOUT, dial(&config))
        .await?
        .err()
        .context("dial should fail")?;

    match err {
        Error::Handshake { ref message, .. } => {
            assert!(message.to_lowercase().contains("certificate"), "{message}");
        }
        other => panic!("expected handshake error, got {other:?}"),
    }

    // The server side sees the client abort the TLS handshake.
    assert!(timeout(TIMEOUT, server).await??.is_err());

    Ok(())
}

#[tokio::test]
async fn test_insecure_skip_verify_accepts_self_signed() -> Result<()> {
    let (url, server) = spawn_tls_server().await?;

    let config = Config::builder()
        .url(url)
        .insecure_skip_verify(true)
        .build()?;
    let connection = timeout(TIMEOUT, dial(&config)).await??;
    assert_eq!(connection.protocol(), None);

    let output = SharedOutput::default();
    let session = Session::attach(connection, output.terminal(), config.transient_policy());

    let outcome = timeout(TIMEOUT, session.wait()).await?;
    assert_eq!(outcome, Outcome::RemoteClosed);

    timeout(TIMEOUT, server).await???;

    Ok(())
}

#[tokio::test]
async fn test_oversized_message_fails_session_without_remote_close() -> Result<()> {
    let (listener, url) = bind().await?;

    let server = tokio::spawn(async move {
        let (_, mut ws) = accept(&listener, false).await?;
        ws.send(Message::text("x".repeat(100))).await?;
        ws.send(Message::text("after")).await?;
        drain(&mut ws).await;
        anyhow::Ok(())
    });

    let config = Config::builder().url(url).max_message_size(16).build()?;
    let connection = timeout(TIMEOUT, dial(&config)).await??;

    let output = SharedOutput::default();
    let session = Session::attach(connection, output.terminal(), config.transient_policy());

    let outcome = timeout(TIMEOUT, session.wait()).await?;
    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(outcome.exit_code(), 1);

    let printed = output.contents();
    assert!(printed.contains("maximum message size"), "{printed}");
    assert!(printed.contains("stopped reading"), "{printed}");
    assert!(!printed.contains("closed by remote"), "{printed}");

    timeout(TIMEOUT, server).await???;

    Ok(())
}
