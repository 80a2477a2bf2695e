use thiserror::Error;

/// Top-level error type for the `emsmon-api` crate.
///
/// Covers the transport and codec failure modes. `emsmon-core` absorbs
/// all of them inside the session worker; none is fatal to the client.
#[derive(Debug, Error)]
pub enum Error {
    // ── Endpoint ────────────────────────────────────────────────────
    /// URL parsing error while building the connection target.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket handshake or read failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Writing a frame to the socket failed.
    #[error("WebSocket send failed: {0}")]
    WebSocketSend(String),

    /// WebSocket closed by the server.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The handshake did not complete in time.
    #[error("WebSocket connect timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// An inbound frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Returns `true` if reconnecting might resolve this error.
    ///
    /// Everything on the socket side is; decode failures are per-frame and
    /// never warrant dropping the connection.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_)
                | Self::WebSocketSend(_)
                | Self::WebSocketClosed { .. }
                | Self::Timeout { .. }
        )
    }
}

/// Failure to turn a text frame into a typed inbound message.
///
/// The offending frame is dropped and the session carries on.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// `func` missing or not one of `menu` / `rtv`.
    #[error("unknown message type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnknownMessageType(Option<String>),

    /// `func` recognised but `data` has the wrong shape.
    #[error("invalid {func} payload: {source}")]
    Schema {
        func: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Returns `true` for frames that parsed but carry an unrecognised `func`.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownMessageType(_))
    }
}
