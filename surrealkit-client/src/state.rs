//! Connection lifecycle state and readiness flags.

use surrealkit_protocol::GRACEFUL_CLOSE_CODES;

/// Lifecycle of the stateful connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never opened.
    Disconnected,
    /// Socket is being opened.
    Connecting,
    /// Socket is open. Commands may still be gated on the handshake.
    Connected,
    /// Socket was closed by either side or failed.
    Closed,
}

impl ConnectionState {
    /// Returns whether a request must open the socket before proceeding.
    pub fn needs_connect(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Closed)
    }
}

/// Snapshot of the connection state plus the two handshake flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub state: ConnectionState,
    pub authenticated: bool,
    pub namespace_selected: bool,
    /// A handshake step was rejected with a critical error.
    pub handshake_failed: bool,
}

impl Readiness {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            authenticated: false,
            namespace_selected: false,
            handshake_failed: false,
        }
    }

    /// Returns whether user commands may be transmitted.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected && self.authenticated && self.namespace_selected
    }

    /// Applies a state transition. Entering `Connecting` clears every flag.
    pub(crate) fn transition(&mut self, next: ConnectionState) {
        if next == ConnectionState::Connecting {
            self.authenticated = false;
            self.namespace_selected = false;
            self.handshake_failed = false;
        }
        self.state = next;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns whether a WebSocket close code means a normal shutdown.
pub fn is_graceful_close(code: u16) -> bool {
    GRACEFUL_CLOSE_CODES.contains(&code)
}
