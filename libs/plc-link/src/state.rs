//! Connection state of a register session

/// Connection state
///
/// A session moves `Disconnected -> Connecting -> Connected` on a successful
/// `connect()` and back to `Disconnected` on `close()` or when every connect
/// attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport handle
    #[default]
    Disconnected,
    /// Inside the connect retry loop
    Connecting,
    /// Handle open and probe read succeeded
    Connected,
}

impl ConnectionState {
    /// Check if state represents an active connection
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionState::Connecting => write!(f, "CONNECTING"),
            ConnectionState::Connected => write!(f, "CONNECTED"),
        }
    }
}
