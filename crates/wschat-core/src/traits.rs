//! Core traits for transports and identity storage.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    Identity,
    protocol::{ClientCommand, ConnectionStatus, ServerEvent},
};

/// Process-unique identifier of one transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next identifier.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a transport reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Connection status transition.
    Status(ConnectionStatus),
    /// Decoded inbound event (or a synthetic error).
    Event(ServerEvent),
}

/// A report from one transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    #[must_use]
    pub const fn status(connection: ConnectionId, status: ConnectionStatus) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Status(status),
        }
    }

    #[must_use]
    pub const fn event(connection: ConnectionId, event: ServerEvent) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Event(event),
        }
    }
}

/// Sender half that transports report into.
pub type TransportSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiver half drained by the session controller.
pub type TransportReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub nickname: String,
    /// Full endpoint URL, query string included.
    pub endpoint: String,
}

/// Send error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Connection is not open")]
    NotConnected,
    #[error("Channel closed")]
    ChannelClosed,
}

/// Live object representing one underlying connection.
pub trait TransportHandle: Send {
    /// Identifier stamped on every event this handle reports.
    fn id(&self) -> ConnectionId;

    /// Current status as seen by the transport.
    fn status(&self) -> ConnectionStatus;

    /// Send a command.
    ///
    /// # Errors
    /// Returns [`SendError::NotConnected`] unless the handle is open.
    fn try_send(&self, command: ClientCommand) -> Result<(), SendError>;

    /// Send a command, silently dropping it unless the handle is open.
    fn send(&self, command: ClientCommand) {
        if let Err(e) = self.try_send(command) {
            tracing::debug!(connection = %self.id(), "Dropped command: {e}");
        }
    }

    /// Request shutdown. Idempotent.
    fn close(&self);
}

/// Factory for transport handles.
pub trait Connector: Send + Sync {
    /// Handle type produced by this connector.
    type Handle: TransportHandle;

    /// Open a connection.
    ///
    /// Reports `connecting` on `events` before returning, then `open` and
    /// decoded events as they happen, then `closed` exactly once.
    fn connect(&self, target: ConnectTarget, events: TransportSender) -> Self::Handle;
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Key-value store for the last-used identity.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load the persisted identity, if any.
    async fn load(&self) -> Result<Option<Identity>, StorageError>;

    /// Persist the identity.
    async fn save(&self, identity: &Identity) -> Result<(), StorageError>;
}
