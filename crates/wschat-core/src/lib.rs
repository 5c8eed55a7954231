//! Core data model for the wschat session manager.
//!
//! This crate provides the fundamental building blocks:
//! - `ClientCommand` / `ServerEvent` - Typed wire protocol
//! - `Transcript` - Bounded ring of transcript entries
//! - `Identity` - Intended nickname and room
//! - Connector, transport handle and identity store traits

pub mod action;
pub mod identity;
pub mod protocol;
pub mod traits;
pub mod transcript;

pub use action::{ActionOutcome, UiAction};
pub use identity::{DEFAULT_NICKNAME, DEFAULT_ROOM, Identity, normalize_input};
pub use protocol::{ClientCommand, ConnectionStatus, PresenceAction, ProtocolError, ServerEvent};
pub use traits::{
    ConnectTarget, ConnectionId, Connector, IdentityStore, SendError, StorageError,
    TransportEvent, TransportEventKind, TransportHandle, TransportReceiver, TransportSender,
};
pub use transcript::{DEFAULT_CAPACITY, EntryId, EntryKind, Transcript, TranscriptEntry};
