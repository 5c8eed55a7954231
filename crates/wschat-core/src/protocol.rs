//! Wire protocol for client-server communication.
//!
//! One JSON object per frame, tagged by its `type` field.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join or switch to a room.
    Join { room: String },
    /// Post text to the currently joined room.
    Message { text: String },
    /// Request a nickname change.
    Nick { nick: String },
    /// Liveness check. No reply is expected.
    Ping,
}

impl ClientCommand {
    /// Serialize into a single text frame.
    ///
    /// # Errors
    /// Returns error if the command cannot be serialized.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Parse a command frame, as a server or an echo peer would.
    ///
    /// # Errors
    /// Returns error if the frame is not a known command shape.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Whether a participant entered or left a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    Join,
    Leave,
}

impl PresenceAction {
    /// Human-readable verb for transcript rendering.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Join => "joined",
            Self::Leave => "left",
        }
    }
}

/// Event from server to client.
///
/// `at` fields are optional ISO-8601 timestamps kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Informational notice.
    System {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
    /// Recoverable problem notice.
    Error {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<String>,
    },
    /// A participant entered or left a room.
    Presence {
        room: String,
        from: String,
        #[serde(rename = "text")]
        action: PresenceAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<String>,
    },
    /// A chat message delivered to a room.
    Message {
        room: String,
        from: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<String>,
    },
}

impl ServerEvent {
    /// Build a local error event without a timestamp.
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error {
            text: text.into(),
            at: None,
        }
    }

    /// Parse an inbound frame.
    ///
    /// Never fails: a frame that is not a known event shape becomes a
    /// synthetic [`ServerEvent::Error`] describing what went wrong.
    #[must_use]
    pub fn decode(frame: &str) -> Self {
        match serde_json::from_str(frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Invalid server event: {e}");
                Self::error(format!("invalid event: {e}"))
            }
        }
    }

    /// Strict parse, for callers that want the failure.
    ///
    /// # Errors
    /// Returns error if the frame is not a known event shape.
    pub fn try_decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }

    /// Serialize into a single text frame.
    ///
    /// # Errors
    /// Returns error if the event cannot be serialized.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Connection status reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

impl ConnectionStatus {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frames() {
        let join = ClientCommand::Join {
            room: "geral".to_string(),
        };
        assert_eq!(join.encode().unwrap(), r#"{"type":"join","room":"geral"}"#);

        let message = ClientCommand::Message {
            text: "oi".to_string(),
        };
        assert_eq!(
            message.encode().unwrap(),
            r#"{"type":"message","text":"oi"}"#
        );

        let nick = ClientCommand::Nick {
            nick: "Ana".to_string(),
        };
        assert_eq!(nick.encode().unwrap(), r#"{"type":"nick","nick":"Ana"}"#);

        assert_eq!(ClientCommand::Ping.encode().unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_decode_presence() {
        let frame = r#"{"type":"presence","room":"geral","from":"Ana","text":"join","at":"2024-01-01T10:00:00Z"}"#;
        let event = ServerEvent::decode(frame);
        assert_eq!(
            event,
            ServerEvent::Presence {
                room: "geral".to_string(),
                from: "Ana".to_string(),
                action: PresenceAction::Join,
                at: Some("2024-01-01T10:00:00Z".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_message_without_timestamp() {
        let frame = r#"{"type":"message","room":"geral","from":"Bob","text":"oi"}"#;
        match ServerEvent::decode(frame) {
            ServerEvent::Message { from, text, at, .. } => {
                assert_eq!(from, "Bob");
                assert_eq!(text, "oi");
                assert!(at.is_none());
            }
            other => panic!("Wrong event type: {other:?}"),
        }
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let frame = r#"{"type":"system","text":"welcome","extra":42}"#;
        assert!(matches!(
            ServerEvent::decode(frame),
            ServerEvent::System { ref text, room: None, at: None } if text == "welcome"
        ));
    }

    #[test]
    fn test_decode_bogus_becomes_error() {
        for frame in [
            r#"{"type":"bogus"}"#,
            "not json at all",
            r#"{"type":"presence","room":"geral","from":"Ana","text":"dance"}"#,
            r#"{"type":"message","room":"geral"}"#,
            "",
        ] {
            match ServerEvent::decode(frame) {
                ServerEvent::Error { text, at } => {
                    assert!(text.starts_with("invalid event"), "{text}");
                    assert!(at.is_none());
                }
                other => panic!("Expected error for {frame:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_try_decode_reports_failure() {
        assert!(ServerEvent::try_decode(r#"{"type":"bogus"}"#).is_err());
        assert!(ClientCommand::decode(r#"{"type":"join"}"#).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ConnectionStatus::Connecting).unwrap();
        assert_eq!(json, r#""connecting""#);
        assert_eq!(ConnectionStatus::Open.to_string(), "open");
    }
}
