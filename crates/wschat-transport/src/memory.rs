//! In-memory transport for tests and embedding.
//!
//! Each handle is paired with a [`MemoryPeer`] that plays the server side:
//! it opens and closes the connection, delivers events and records every
//! frame the client sent.

use std::sync::{Arc, Mutex, PoisonError};

use wschat_core::{
    ClientCommand, ConnectTarget, ConnectionId, ConnectionStatus, Connector, SendError,
    ServerEvent, TransportEvent, TransportHandle, TransportSender,
};

use crate::status::StatusCell;

#[derive(Debug, Default)]
struct ConnectorState {
    auto_open: bool,
    peers: Vec<MemoryPeer>,
}

/// Connector producing in-memory handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MemoryConnector {
    /// Connector whose connections stay `connecting` until opened by the peer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose connections open right after reporting `connecting`.
    #[must_use]
    pub fn auto_open() -> Self {
        let connector = Self::new();
        connector.lock().auto_open = true;
        connector
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Server sides of every connection made so far, oldest first.
    #[must_use]
    pub fn peers(&self) -> Vec<MemoryPeer> {
        self.lock().peers.clone()
    }

    /// Server side of the most recent connection.
    #[must_use]
    pub fn last_peer(&self) -> Option<MemoryPeer> {
        self.lock().peers.last().cloned()
    }

    /// Number of connections made so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().peers.len()
    }
}

impl Connector for MemoryConnector {
    type Handle = MemoryHandle;

    fn connect(&self, target: ConnectTarget, events: TransportSender) -> MemoryHandle {
        let shared = Arc::new(Shared {
            id: ConnectionId::next(),
            target,
            status: StatusCell::new(ConnectionStatus::Connecting),
            events,
            sent: Mutex::new(Vec::new()),
        });
        shared.report(TransportEvent::status(shared.id, ConnectionStatus::Connecting));

        let peer = MemoryPeer {
            shared: Arc::clone(&shared),
        };
        let auto_open = {
            let mut state = self.lock();
            state.peers.push(peer.clone());
            state.auto_open
        };
        if auto_open {
            peer.open();
        }

        MemoryHandle { shared }
    }
}

#[derive(Debug)]
struct Shared {
    id: ConnectionId,
    target: ConnectTarget,
    status: StatusCell,
    events: TransportSender,
    sent: Mutex<Vec<String>>,
}

impl Shared {
    fn report(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    fn close(&self) {
        if self.status.close() {
            self.report(TransportEvent::status(self.id, ConnectionStatus::Closed));
        }
    }

    fn sent(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
}

impl TransportHandle for MemoryHandle {
    fn id(&self) -> ConnectionId {
        self.shared.id
    }

    fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    fn try_send(&self, command: ClientCommand) -> Result<(), SendError> {
        if self.shared.status.get() != ConnectionStatus::Open {
            return Err(SendError::NotConnected);
        }
        match command.encode() {
            Ok(frame) => self.shared.sent().push(frame),
            Err(e) => self
                .shared
                .report(TransportEvent::event(self.shared.id, ServerEvent::error(e.to_string()))),
        }
        Ok(())
    }

    fn close(&self) {
        self.shared.close();
    }
}

/// Server side of an in-memory connection.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    shared: Arc<Shared>,
}

impl MemoryPeer {
    /// Identifier of the paired handle.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Target the client connected to.
    #[must_use]
    pub fn target(&self) -> &ConnectTarget {
        &self.shared.target
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    /// Accept the connection. No-op unless still `connecting`.
    pub fn open(&self) {
        if self.shared.status.open() {
            self.shared
                .report(TransportEvent::status(self.shared.id, ConnectionStatus::Open));
        }
    }

    /// Deliver an event. Dropped once the connection is closed.
    pub fn deliver(&self, event: ServerEvent) {
        if self.status() != ConnectionStatus::Closed {
            self.shared
                .report(TransportEvent::event(self.shared.id, event));
        }
    }

    /// Deliver a raw text frame through the inbound decoder.
    pub fn deliver_frame(&self, frame: &str) {
        self.deliver(ServerEvent::decode(frame));
    }

    /// Simulate a transport-level fault without closing.
    pub fn fault(&self, text: impl Into<String>) {
        self.deliver(ServerEvent::error(text));
    }

    /// Close from the server side.
    pub fn close_remote(&self) {
        self.shared.close();
    }

    /// Frames the client sent, in order.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<String> {
        self.shared.sent().clone()
    }

    /// Frames the client sent, decoded as commands.
    #[must_use]
    pub fn sent_commands(&self) -> Vec<ClientCommand> {
        self.shared
            .sent()
            .iter()
            .filter_map(|frame| ClientCommand::decode(frame).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use wschat_core::{TransportEventKind, TransportReceiver};

    use super::*;

    fn target() -> ConnectTarget {
        ConnectTarget {
            nickname: "Ana".to_string(),
            endpoint: "ws://localhost:8080/ws?nick=Ana".to_string(),
        }
    }

    fn drain(rx: &mut TransportReceiver) -> Vec<TransportEventKind> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_lifecycle() {
        let connector = MemoryConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = connector.connect(target(), tx);
        let peer = connector.last_peer().unwrap();
        assert_eq!(peer.id(), handle.id());

        handle.send(ClientCommand::Ping);
        assert!(peer.sent_frames().is_empty());

        peer.open();
        peer.deliver_frame(r#"{"type":"system","text":"hello"}"#);
        handle.close();
        handle.close();
        peer.close_remote();
        peer.deliver(ServerEvent::error("late"));

        assert_eq!(
            drain(&mut rx),
            [
                TransportEventKind::Status(ConnectionStatus::Connecting),
                TransportEventKind::Status(ConnectionStatus::Open),
                TransportEventKind::Event(ServerEvent::System {
                    text: "hello".to_string(),
                    at: None,
                    room: None,
                }),
                TransportEventKind::Status(ConnectionStatus::Closed),
            ]
        );
    }

    #[test]
    fn test_join_round_trip() {
        let connector = MemoryConnector::auto_open();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = connector.connect(target(), tx);

        let join = ClientCommand::Join {
            room: "geral".to_string(),
        };
        handle.try_send(join.clone()).unwrap();

        let peer = connector.last_peer().unwrap();
        assert_eq!(peer.sent_frames(), [r#"{"type":"join","room":"geral"}"#]);
        assert_eq!(peer.sent_commands(), [join]);
    }

    #[test]
    fn test_unknown_frame_becomes_error() {
        let connector = MemoryConnector::auto_open();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = connector.connect(target(), tx);
        connector.last_peer().unwrap().deliver_frame(r#"{"type":"bogus"}"#);

        let kinds = drain(&mut rx);
        assert_eq!(kinds.len(), 3);
        assert!(matches!(
            kinds[2],
            TransportEventKind::Event(ServerEvent::Error { .. })
        ));
    }

    #[test]
    fn test_send_after_close_is_not_connected() {
        let connector = MemoryConnector::auto_open();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = connector.connect(target(), tx);
        handle.close();
        assert_eq!(
            handle.try_send(ClientCommand::Ping),
            Err(SendError::NotConnected)
        );
        assert_eq!(connector.connection_count(), 1);
    }
}
