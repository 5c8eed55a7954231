//! User identity for a chat session.

use serde::{Deserialize, Serialize};

/// Nickname used when nothing else is configured or persisted.
pub const DEFAULT_NICKNAME: &str = "guest";

/// Room joined when nothing else is configured or persisted.
pub const DEFAULT_ROOM: &str = "geral";

/// Intended nickname and room.
///
/// Owned by the session controller and persisted by the caller, so a later
/// session can restore a prior session's intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub nickname: String,
    pub room: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(nickname: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            room: room.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(DEFAULT_NICKNAME, DEFAULT_ROOM)
    }
}

/// Trim user input, treating whitespace-only strings as absent.
#[must_use]
pub fn normalize_input(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_input() {
        assert_eq!(normalize_input("  geral "), Some("geral"));
        assert_eq!(normalize_input(""), None);
        assert_eq!(normalize_input(" \t\n"), None);
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity::new("Ana", "tecnologia");
        let json = serde_json::to_string(&identity).unwrap();
        let parsed: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);
        assert_eq!(Identity::default().room, DEFAULT_ROOM);
    }
}
