//! Connection lifecycle state.

/// Lifecycle phase of the transport connection.
///
/// Owned exclusively by the connection manager; state transitions are the
/// only mutation path. Callers observe it through
/// [`ConnectionManager::state`](crate::ConnectionManager::state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and no attempt in progress.
    #[default]
    Disconnected,
    /// Initial connect attempt in progress.
    Connecting,
    /// Connection established, subscriptions live.
    Connected,
    /// Scheduler-driven reconnect attempt in progress.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` while a connect attempt is in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}
