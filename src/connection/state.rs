//! Connection state machine
//!
//! Tracks the signaling channel from connect to disconnect, including the
//! reconnect loop.

/// Signaling connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No signaling channel
    Disconnected,
    /// First handshake in progress
    Connecting,
    /// Channel open and acknowledged
    Connected,
    /// Channel dropped, retrying
    Reconnecting,
    /// Retries exhausted or connection rejected
    Failed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed)
                | (Connecting, Disconnected)
                | (Connected, Reconnecting)
                | (Connected, Disconnected)
                | (Reconnecting, Connected)
                | (Reconnecting, Failed)
                | (Reconnecting, Disconnected)
                | (Failed, Connecting)
                | (Failed, Disconnected)
        )
    }

    /// Whether `connect` may be called in this state
    pub fn can_connect(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }

    /// Check if the channel is up
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_connect_lifecycle() {
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Connecting));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Reconnecting));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Failed.can_transition_to(Connected));
    }

    #[test]
    fn test_can_connect() {
        assert!(Disconnected.can_connect());
        assert!(Failed.can_connect());
        assert!(!Connecting.can_connect());
        assert!(!Connected.can_connect());
        assert!(!Reconnecting.can_connect());
    }
}
