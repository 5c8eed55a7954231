//! Chat server endpoint construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// URL scheme of the chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Ws,
    Wss,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        })
    }
}

/// Chat server location.
///
/// Defaults to the development server at `ws://localhost:8080/ws`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            scheme: Scheme::Ws,
            host: "localhost".to_string(),
            port: 8080,
            path: "/ws".to_string(),
        }
    }
}

impl Endpoint {
    /// Endpoint with the default path.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Base URL without the query string.
    #[must_use]
    pub fn base_url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("{}://{}:{}/{path}", self.scheme, self.host, self.port)
    }

    /// Full URL for a nickname. The nickname is percent-encoded.
    #[must_use]
    pub fn url_for(&self, nickname: &str) -> String {
        format!("{}?nick={}", self.base_url(), urlencoding::encode(nickname))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}
