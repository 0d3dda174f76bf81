//! Connection lifecycle states driven by connect, disconnect and the reconnect loop.

use std::fmt;

/// Where the client currently sits in its connect/reconnect lifecycle.
///
/// ```text
/// Disconnected -> Connecting -> Connected
///      ^              |             |
///      |   (failure)  |             | (transport lost, auto-reconnect on)
///      +--------------+             v
///      ^                       Reconnecting <-> Connecting
///      |                            |
///      +----- disconnect() ---------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
