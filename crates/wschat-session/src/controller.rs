//! Session controller for a chat connection.
//!
//! The controller owns the user's identity, the transcript and at most one
//! live transport handle. It turns front-end actions into protocol commands,
//! guards the ones that need an open connection and folds transport events
//! into transcript entries.

use futures::{StreamExt, future, stream::BoxStream};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use wschat_core::{
    ActionOutcome, ClientCommand, ConnectTarget, ConnectionStatus, Connector, Identity,
    IdentityStore, ServerEvent, Transcript, TranscriptEntry, TransportEvent, TransportEventKind,
    TransportHandle, TransportReceiver, TransportSender, UiAction, normalize_input,
};
use wschat_transport::Endpoint;

use crate::ChatConfig;

/// Buffered updates per subscriber before it starts lagging.
const UPDATE_BUFFER: usize = 1024;

const WELCOME: &str = "Connect, join a room and start chatting.";

const CLOSED_NOTICE: &str = "Connection closed.";

/// Change published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Connection status changed.
    Status(ConnectionStatus),
    /// An entry was appended to the transcript.
    Entry(TranscriptEntry),
    /// The intended identity changed.
    Identity(Identity),
}

/// Session controller.
pub struct SessionController<C, S>
where
    C: Connector,
    S: IdentityStore,
{
    connector: C,
    store: S,
    endpoint: Endpoint,
    quick_rooms: Vec<String>,
    identity: Identity,
    status: ConnectionStatus,
    transcript: Transcript,
    /// Live handle. `None` while disconnected.
    handle: Option<C::Handle>,
    events_tx: TransportSender,
    events_rx: TransportReceiver,
    updates: broadcast::Sender<SessionUpdate>,
}

impl<C, S> SessionController<C, S>
where
    C: Connector,
    S: IdentityStore,
{
    /// Create a controller. Nothing connects until [`Self::start_session`].
    #[must_use]
    pub fn new(config: ChatConfig, connector: C, store: S) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);

        let mut controller = Self {
            connector,
            store,
            endpoint: config.endpoint,
            quick_rooms: config.quick_rooms,
            identity: config.identity,
            status: ConnectionStatus::Closed,
            transcript: Transcript::new(config.transcript_capacity),
            handle: None,
            events_tx,
            events_rx,
            updates,
        };
        controller.append(TranscriptEntry::system(WELCOME));
        controller
    }

    /// Prefill the identity from the store.
    ///
    /// Returns whether a persisted identity was found.
    pub async fn restore_identity(&mut self) -> bool {
        match self.store.load().await {
            Ok(Some(identity)) => {
                tracing::debug!(nickname = %identity.nickname, room = %identity.room, "Restored identity");
                self.set_identity(identity);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to restore identity: {e}");
                false
            }
        }
    }

    /// Open a new connection as `nickname`.
    ///
    /// A blank nickname keeps the current one. Any existing handle is
    /// detached and closed first.
    pub async fn start_session(&mut self, nickname: &str) {
        if let Some(nickname) = normalize_input(nickname) {
            let identity = Identity::new(nickname, self.identity.room.clone());
            self.set_identity(identity);
        }
        self.persist().await;

        self.detach();

        let url = self.endpoint.url_for(&self.identity.nickname);
        let target = ConnectTarget {
            nickname: self.identity.nickname.clone(),
            endpoint: url.clone(),
        };
        let handle = self.connector.connect(target, self.events_tx.clone());
        tracing::info!(connection = %handle.id(), %url, "Starting session");
        self.handle = Some(handle);

        self.append(TranscriptEntry::system(format!("Connecting to {url}")));
        self.pump();
    }

    /// Close the connection, if any.
    ///
    /// Closing a live handle reads the same as any other closure: the
    /// `Connection closed.` notice follows `Disconnected.`.
    pub fn end_session(&mut self) {
        let was_live = self.detach();
        self.set_status(ConnectionStatus::Closed);
        self.append(TranscriptEntry::system("Disconnected."));
        if was_live {
            self.append(TranscriptEntry::error(CLOSED_NOTICE));
        }
    }

    /// Set the room joined on the next open without sending anything.
    ///
    /// Returns `false` for a blank room.
    pub async fn prefer_room(&mut self, room: &str) -> bool {
        let Some(room) = normalize_input(room) else {
            return false;
        };
        self.set_identity(Identity::new(self.identity.nickname.clone(), room));
        self.persist().await;
        true
    }

    /// Join or switch rooms.
    ///
    /// The intended room is updated even while disconnected, so the next
    /// session joins it.
    pub async fn request_join(&mut self, room: &str) -> ActionOutcome {
        let Some(room) = normalize_input(room) else {
            return ActionOutcome::Rejected;
        };
        let room = room.to_string();
        self.prefer_room(&room).await;

        if !self.is_open() {
            self.append(TranscriptEntry::error("Connect before joining a room."));
            return ActionOutcome::NotConnected;
        }

        self.send(ClientCommand::Join { room: room.clone() });
        self.append(TranscriptEntry::system(format!("Joining room {room}...")));
        ActionOutcome::Sent
    }

    /// Change nickname. The local identity is updated before the server
    /// confirms.
    pub async fn request_nick(&mut self, nickname: &str) -> ActionOutcome {
        let Some(nickname) = normalize_input(nickname) else {
            return ActionOutcome::Rejected;
        };
        let nickname = nickname.to_string();
        self.set_identity(Identity::new(nickname.clone(), self.identity.room.clone()));
        self.persist().await;

        if !self.is_open() {
            self.append(TranscriptEntry::error("Connect before changing your nickname."));
            return ActionOutcome::NotConnected;
        }

        self.send(ClientCommand::Nick {
            nick: nickname.clone(),
        });
        self.append(TranscriptEntry::system(format!(
            "Requesting nickname change to {nickname}..."
        )));
        ActionOutcome::Sent
    }

    /// Post a message to the current room.
    ///
    /// [`ActionOutcome::Sent`] tells the caller to clear its draft.
    pub fn send_message(&mut self, text: &str) -> ActionOutcome {
        let Some(text) = normalize_input(text) else {
            return ActionOutcome::Rejected;
        };

        if !self.is_open() {
            self.append(TranscriptEntry::error("Connect before sending messages."));
            return ActionOutcome::NotConnected;
        }

        self.send(ClientCommand::Message {
            text: text.to_string(),
        });
        ActionOutcome::Sent
    }

    /// Liveness check. Nothing is recorded when disconnected.
    pub fn ping(&mut self) -> ActionOutcome {
        if !self.is_open() {
            return ActionOutcome::NotConnected;
        }
        self.send(ClientCommand::Ping);
        ActionOutcome::Sent
    }

    /// Dispatch a front-end action.
    ///
    /// `Connect`, `Disconnect` and `Quit` always report [`ActionOutcome::Sent`].
    pub async fn apply(&mut self, action: UiAction) -> ActionOutcome {
        match action {
            UiAction::Connect { nickname } => {
                let nickname = nickname.unwrap_or_else(|| self.identity.nickname.clone());
                self.start_session(&nickname).await;
                ActionOutcome::Sent
            }
            UiAction::Disconnect | UiAction::Quit => {
                self.end_session();
                ActionOutcome::Sent
            }
            UiAction::Join { room } => self.request_join(&room).await,
            UiAction::Nick { nickname } => self.request_nick(&nickname).await,
            UiAction::Send { text } => self.send_message(&text),
            UiAction::Ping => self.ping(),
        }
    }

    /// Fold one inbound event into exactly one transcript entry.
    pub fn on_inbound_event(&mut self, event: ServerEvent) {
        self.append(TranscriptEntry::from_event(event));
    }

    /// React to a transport report.
    ///
    /// Reports from any handle other than the live one are ignored.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let live = self.handle.as_ref().map(TransportHandle::id);
        if live != Some(event.connection) {
            tracing::debug!(connection = %event.connection, "Ignoring event from detached handle");
            return;
        }

        match event.kind {
            TransportEventKind::Status(status) => self.on_status(status),
            TransportEventKind::Event(event) => self.on_inbound_event(event),
        }
    }

    /// Handle every pending transport report without waiting.
    ///
    /// Returns how many reports were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_transport_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next transport report.
    pub async fn next_transport_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next transport report and handle it.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_transport_event(event);
        }
    }

    /// Receiver for future updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Stream of future updates. Lagged updates are skipped.
    #[must_use]
    pub fn updates(&self) -> BoxStream<'static, SessionUpdate> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|res| future::ready(res.ok()))
            .boxed()
    }

    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether guarded actions can go out.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Open && self.handle.is_some()
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Owned copy of the transcript for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.transcript.snapshot()
    }

    /// URL the current nickname would connect to.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        self.endpoint.url_for(&self.identity.nickname)
    }

    #[must_use]
    pub fn quick_rooms(&self) -> &[String] {
        &self.quick_rooms
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn on_status(&mut self, status: ConnectionStatus) {
        self.set_status(status);
        match status {
            ConnectionStatus::Connecting => {}
            ConnectionStatus::Open => {
                let room = self.identity.room.clone();
                self.send(ClientCommand::Join { room: room.clone() });
                self.append(TranscriptEntry::system(format!(
                    "Connected. Joining room {room}..."
                )));
            }
            ConnectionStatus::Closed => {
                // A closed handle is never reused.
                self.handle = None;
                self.append(TranscriptEntry::error(CLOSED_NOTICE));
            }
        }
    }

    /// Take the live handle out of its slot, then close it.
    ///
    /// Returns whether a handle was live.
    fn detach(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        tracing::debug!(connection = %handle.id(), "Detaching handle");
        handle.close();
        true
    }

    fn send(&self, command: ClientCommand) {
        if let Some(handle) = &self.handle {
            handle.send(command);
        }
    }

    fn append(&mut self, entry: TranscriptEntry) {
        tracing::trace!(id = %entry.id, kind = ?entry.kind, "Transcript entry");
        let _ = self.updates.send(SessionUpdate::Entry(entry.clone()));
        self.transcript.push(entry);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "Session status");
            self.status = status;
            let _ = self.updates.send(SessionUpdate::Status(status));
        }
    }

    fn set_identity(&mut self, identity: Identity) {
        if self.identity != identity {
            self.identity = identity;
            let _ = self
                .updates
                .send(SessionUpdate::Identity(self.identity.clone()));
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.identity).await {
            tracing::warn!("Failed to persist identity: {e}");
        }
    }
}
