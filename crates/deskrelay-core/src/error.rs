//! Client-level error types.

use thiserror::Error;

/// Errors that can occur while operating the realtime client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No bearer credential was available at connect time.
    ///
    /// This is a policy failure, not a transient one — the client never
    /// retries it.
    #[error("no bearer credential available")]
    AuthenticationMissing,

    /// Handshake or mid-session socket error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection closed with a non-normal close code.
    #[error("connection closed abnormally (code {code:?})")]
    AbnormalClose { code: Option<u16> },

    /// `subscribe`/`send` attempted while the connection is not up.
    #[error("not connected")]
    NotConnected,

    /// The connect handshake did not complete within the configured bound.
    #[error("handshake timed out after {ms}ms")]
    HandshakeTimeout { ms: u64 },

    /// A wire frame could not be parsed.
    #[error("malformed frame: {0}")]
    Frame(String),

    /// A message body could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns `true` if this error is transient and worth a reconnect attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::AbnormalClose { .. } | Self::HandshakeTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_missing_is_not_retryable() {
        assert!(!ClientError::AuthenticationMissing.is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        assert!(ClientError::Transport("connection refused".into()).is_retryable());
        assert!(ClientError::AbnormalClose { code: Some(1006) }.is_retryable());
        assert!(ClientError::HandshakeTimeout { ms: 10_000 }.is_retryable());
    }

    #[test]
    fn not_connected_is_not_retryable() {
        assert!(!ClientError::NotConnected.is_retryable());
    }
}
