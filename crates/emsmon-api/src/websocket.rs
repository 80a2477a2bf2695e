//! WebSocket transport to a telemetry endpoint.
//!
//! [`Endpoint`] describes *where* to connect: a base URL, the opaque
//! authorization token appended to it, and the `User-Agent` / `Origin`
//! headers the server insists on. [`connect`] performs the handshake and
//! hands back split writer/reader halves ready for a `tokio::select!` loop.
//! Reconnection policy lives one layer up, in `emsmon-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use emsmon_api::{Endpoint, Outbound, websocket};
//!
//! let endpoint = Endpoint::new("ws://10.0.0.5:8888/".parse()?, token);
//! let (mut writer, mut reader) = websocket::connect(&endpoint, Duration::from_secs(10)).await?;
//! writer.send(&Outbound::Menu).await?;
//! while let Some(frame) = reader.recv().await {
//!     println!("{:?}", frame?);
//! }
//! ```

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use url::Url;

use crate::error::Error;
use crate::protocol::Outbound;

/// Browser identity the telemetry server expects on the upgrade request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ── Endpoint ─────────────────────────────────────────────────────────

/// Connection target for one telemetry server.
///
/// The token is kept secret: it only materialises inside [`target`](Self::target)
/// and never shows up in `Debug` output. Log [`base`](Self::base) instead.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
    token: SecretString,
    user_agent: String,
    origin: String,
}

impl Endpoint {
    /// Endpoint with the default `User-Agent` and an `Origin` derived from `base`.
    pub fn new(base: Url, token: SecretString) -> Self {
        let origin = http_origin(&base);
        Self {
            base,
            token,
            user_agent: DEFAULT_USER_AGENT.into(),
            origin,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Base URL without the token. Safe to log.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full connection URL: `base` with the token appended as the final
    /// path segment (the token may carry its own `?query`).
    pub fn target(&self) -> Result<Url, Error> {
        let token = self.token.expose_secret().trim_start_matches('/');
        if token.is_empty() {
            return Ok(self.base.clone());
        }
        Ok(self.base.join(token)?)
    }

    /// Upgrade request carrying the protocol-required headers.
    pub fn client_request(&self) -> Result<ClientRequestBuilder, Error> {
        let target = self.target()?;
        let uri: tungstenite::http::Uri = target.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        Ok(ClientRequestBuilder::new(uri)
            .with_header("User-Agent", self.user_agent.clone())
            .with_header("Origin", self.origin.clone()))
    }
}

/// `http(s)://host[:port]` for a `ws(s)://` base URL.
fn http_origin(base: &Url) -> String {
    let scheme = if base.scheme() == "wss" { "https" } else { "http" };
    let host = base.host_str().unwrap_or("localhost");
    match base.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    }
}

// ── Connection halves ────────────────────────────────────────────────

/// A frame surfaced to the session. Control frames are handled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame; the only kind the protocol uses.
    Text(String),
    /// Binary frame (payload length only; the protocol never sends these).
    Binary(usize),
    /// Close frame from the server.
    Close { code: u16, reason: String },
}

/// Write half of an open connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Serialize and send one subscription request.
    pub async fn send(&mut self, message: &Outbound) -> Result<(), Error> {
        let text = message
            .to_json()
            .map_err(|e| Error::WebSocketSend(e.to_string()))?;
        self.sink
            .send(tungstenite::Message::Text(text.into()))
            .await
            .map_err(|e| Error::WebSocketSend(e.to_string()))
    }

    /// Send a close frame. Errors are expected if the peer is already gone.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .map_err(|e| Error::WebSocketSend(e.to_string()))
    }
}

/// Read half of an open connection.
#[derive(Debug)]
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Next data or close frame; `None` once the stream has ended.
    ///
    /// Ping/pong and raw frames are skipped (tungstenite answers pings).
    pub async fn recv(&mut self) -> Option<Result<Frame, Error>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(Frame::Text(text.as_str().to_owned())));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Some(Ok(Frame::Binary(data.len())));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame.map_or((1005, String::new()), |cf| {
                        (u16::from(cf.code), cf.reason.as_str().to_owned())
                    });
                    return Some(Ok(Frame::Close { code, reason }));
                }
                Some(Ok(
                    tungstenite::Message::Ping(_)
                    | tungstenite::Message::Pong(_)
                    | tungstenite::Message::Frame(_),
                )) => {
                    tracing::trace!("WebSocket control frame");
                }
                Some(Err(e)) => return Some(Err(Error::WebSocketConnect(e.to_string()))),
                None => return None,
            }
        }
    }
}

// ── Connect ──────────────────────────────────────────────────────────

/// Open a connection to `endpoint`, giving up after `timeout`.
pub async fn connect(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<(WsWriter, WsReader), Error> {
    let request = endpoint.client_request()?;

    tracing::debug!(endpoint = %endpoint.base(), "Opening WebSocket");

    let (ws_stream, _response) =
        tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })?
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (sink, stream) = ws_stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

// ── Tests ────────────────────────────────────────────────────────────
