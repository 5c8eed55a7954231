//! Front-end intents.

use serde::{Deserialize, Serialize};

/// An action requested by whatever renders the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    /// Open a new connection, optionally under a new nickname.
    Connect { nickname: Option<String> },
    /// Close the current connection.
    Disconnect,
    /// Join or switch rooms.
    Join { room: String },
    /// Change nickname.
    Nick { nickname: String },
    /// Post a message to the current room.
    Send { text: String },
    /// Liveness check.
    Ping,
    /// Leave the front end.
    Quit,
}

/// Result of a guarded controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A command was handed to the transport.
    Sent,
    /// Input was empty or whitespace-only. Nothing happened.
    Rejected,
    /// No open connection. No command was sent.
    NotConnected,
}

impl ActionOutcome {
    /// Whether a command went out.
    #[must_use]
    pub const fn is_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}
