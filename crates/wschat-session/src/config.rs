//! Session configuration.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wschat_core::{DEFAULT_CAPACITY, Identity};
use wschat_transport::Endpoint;

/// Rooms offered as one-key shortcuts by front ends.
pub const QUICK_ROOMS: [&str; 5] = ["geral", "tecnologia", "random", "anime", "musica"];

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session configuration.
///
/// Every field has a default, so a config file only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Chat server location.
    pub endpoint: Endpoint,
    /// Maximum number of transcript entries kept.
    pub transcript_capacity: usize,
    /// Identity used until one is restored or changed.
    pub identity: Identity,
    /// Room shortcuts.
    pub quick_rooms: Vec<String>,
    /// Interval between keepalive pings, in seconds. `None` disables them.
    pub keepalive_secs: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            transcript_capacity: DEFAULT_CAPACITY,
            identity: Identity::default(),
            quick_rooms: QUICK_ROOMS.iter().map(ToString::to_string).collect(),
            keepalive_secs: None,
        }
    }
}

impl ChatConfig {
    /// Load from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Keepalive interval, if enabled and non-zero.
    #[must_use]
    pub fn keepalive(&self) -> Option<Duration> {
        self.keepalive_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: ChatConfig =
            serde_json::from_str(r#"{"endpoint":{"port":9000},"keepalive_secs":30}"#).unwrap();
        assert_eq!(config.endpoint.port, 9000);
        assert_eq!(config.endpoint.host, "localhost");
        assert_eq!(config.transcript_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.keepalive(), Some(Duration::from_secs(30)));
        assert_eq!(config.quick_rooms.len(), QUICK_ROOMS.len());
    }

    #[test]
    fn test_zero_keepalive_is_disabled() {
        let config = ChatConfig {
            keepalive_secs: Some(0),
            ..ChatConfig::default()
        };
        assert!(config.keepalive().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wschat.json");
        std::fs::write(&path, r#"{"identity":{"nickname":"Ana","room":"anime"}}"#).unwrap();

        let config = ChatConfig::load(&path).unwrap();
        assert_eq!(config.identity, Identity::new("Ana", "anime"));

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(ChatConfig::load(&path).unwrap(), ChatConfig::default());

        std::fs::write(&path, r#"{"transcript_capacity":"x"}"#).unwrap();
        assert!(matches!(ChatConfig::load(&path), Err(ConfigError::Parse(_))));

        std::fs::write(&path, "{nope").unwrap();
        assert!(matches!(ChatConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
