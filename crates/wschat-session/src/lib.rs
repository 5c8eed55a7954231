//! Session orchestration and identity storage for wschat.
//!
//! Provides:
//! - `SessionController` - Drive one chat session over any connector
//! - `ChatConfig` - Endpoint, transcript and identity defaults
//! - Identity storage implementations (memory, file)

pub mod config;
pub mod controller;
pub mod storage;

pub use config::{ChatConfig, ConfigError, QUICK_ROOMS};
pub use controller::{SessionController, SessionUpdate};

/// Controller speaking WebSocket.
#[cfg(feature = "websocket")]
pub type WebSocketSession<S> = SessionController<wschat_transport::WebSocketConnector, S>;
