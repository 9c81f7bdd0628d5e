//! The `Transport` trait — the seam between the connection manager and the
//! underlying socket.
//!
//! A transport hands back a [`TransportSession`]: a channel pair the client
//! writes raw frames into and reads [`TransportEvent`]s out of. Production
//! uses the WebSocket implementation in `deskrelay-client`; tests inject an
//! in-memory one.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// WebSocket normal-closure code. Any other close code is abnormal.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// An event surfaced by the transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A raw text frame off the wire.
    Frame(String),
    /// The connection closed. `code` is the close code if the peer sent one.
    Closed { code: Option<u16>, reason: String },
}

impl TransportEvent {
    /// Returns `true` for an explicit, normal closure (no reconnect).
    pub fn is_normal_close(&self) -> bool {
        matches!(self, Self::Closed { code: Some(c), .. } if *c == NORMAL_CLOSE_CODE)
    }
}

/// A live transport session.
///
/// Dropping `outgoing` closes the session (the transport sends a close frame
/// best-effort and tears down its pump task).
pub struct TransportSession {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transport sessions.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a session against `url`, sending `headers` with the handshake.
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<TransportSession, ClientError>;
}

/// Supplies the current bearer token.
///
/// Token refresh and expiry are the provider's responsibility; the client
/// only asks for the value current at connect time.
pub trait CredentialProvider: Send + Sync + 'static {
    /// Returns the bearer token, or `None` if no credential is available.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed-token provider, for CLIs and tests.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
