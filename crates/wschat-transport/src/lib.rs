//! Session transport for wschat.
//!
//! Provides:
//! - Endpoint construction
//! - WebSocket connector (feature: websocket)
//! - In-memory connector for tests and embedding
//! - Terminal input bridge (feature: tui)

pub mod endpoint;
pub mod memory;
mod status;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "tui")]
pub mod tui;

pub use endpoint::{Endpoint, Scheme};
pub use memory::{MemoryConnector, MemoryHandle, MemoryPeer};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketHandle};
