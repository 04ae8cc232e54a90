//! Connection error type for retry classification.

use std::fmt;

use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::token::TokenError;

/// Error surfaced by a connection attempt or by a per-connection handler.
///
/// Kept as a dedicated type so the manager can classify retries before
/// anything is converted to anyhow.
#[derive(Debug)]
pub enum ClientError {
    /// Target URL failed validation (bad scheme, missing host). Never retried.
    InvalidUrl(String),
    /// Server rejected the HTTP upgrade with this status code.
    Handshake(u16),
    /// TCP-level connect failure (connection refused).
    Refused(std::io::Error),
    /// Remote closed the connection; `code` is the close code if one was
    /// received, `None` for an abnormal or codeless closure.
    Closed {
        code: Option<u16>,
        reason: String,
    },
    /// Connect attempt exceeded the handshake deadline.
    Timeout,
    /// Malformed handshake or frame from the remote.
    Protocol(WsError),
    /// TLS context construction or handshake failure.
    Tls(String),
    /// An inbound record failed to decode (bad JSON, base64, or YAML).
    Decode(String),
    /// Credential renewal failed.
    Token(TokenError),
    /// Shutdown was requested. Never retried, never suppressed.
    Cancelled,
    /// Filesystem failure while spooling payloads.
    Io(std::io::Error),
    /// Any other transport error.
    Transport(WsError),
}

impl ClientError {
    /// Map a tungstenite error into the classifiable shape.
    ///
    /// Send/recv failures after the peer dropped the TCP stream (reset,
    /// broken pipe) count as abnormal closures, not generic I/O errors, so
    /// the flow's close tolerance decides whether they retry.
    pub fn from_ws(err: WsError) -> Self {
        match err {
            WsError::Http(response) => ClientError::Handshake(response.status().as_u16()),
            WsError::ConnectionClosed | WsError::AlreadyClosed => ClientError::Closed {
                code: None,
                reason: String::new(),
            },
            WsError::Io(io) => match io.kind() {
                std::io::ErrorKind::ConnectionRefused => ClientError::Refused(io),
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => ClientError::Closed {
                    code: None,
                    reason: io.to_string(),
                },
                _ => ClientError::Io(io),
            },
            WsError::Protocol(_) => ClientError::Protocol(err),
            WsError::Tls(tls) => ClientError::Tls(tls.to_string()),
            other => ClientError::Transport(other),
        }
    }

    /// Map a received close frame (or its absence) into `Closed`.
    pub fn from_close(frame: Option<CloseFrame<'_>>) -> Self {
        match frame {
            Some(frame) => ClientError::Closed {
                code: Some(frame.code.into()),
                reason: frame.reason.into_owned(),
            },
            None => ClientError::Closed {
                code: None,
                reason: String::new(),
            },
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidUrl(url) => write!(f, "invalid websocket url: {url:?}"),
            ClientError::Handshake(status) => write!(f, "upgrade rejected with HTTP {status}"),
            ClientError::Refused(e) => write!(f, "connect refused: {e}"),
            ClientError::Closed { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed by remote: {code} {reason}")
            }
            ClientError::Closed { code: Some(code), .. } => {
                write!(f, "closed by remote: {code}")
            }
            ClientError::Closed { reason, .. } if !reason.is_empty() => {
                write!(f, "closed by remote: {reason}")
            }
            ClientError::Closed { .. } => write!(f, "closed by remote"),
            ClientError::Timeout => write!(f, "connect timed out"),
            ClientError::Protocol(e) => write!(f, "protocol error: {e}"),
            ClientError::Tls(e) => write!(f, "tls: {e}"),
            ClientError::Decode(e) => write!(f, "decode: {e}"),
            ClientError::Token(e) => write!(f, "token renewal: {e}"),
            ClientError::Cancelled => write!(f, "cancelled"),
            ClientError::Io(e) => write!(f, "io: {e}"),
            ClientError::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Refused(e) | ClientError::Io(e) => Some(e),
            ClientError::Protocol(e) | ClientError::Transport(e) => Some(e),
            ClientError::Token(e) => Some(e),
            _ => None,
        }
    }
}
