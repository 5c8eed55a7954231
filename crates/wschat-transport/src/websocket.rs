//! WebSocket transport for chat servers.

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use wschat_core::{
    ClientCommand, ConnectTarget, ConnectionId, ConnectionStatus, Connector, SendError,
    ServerEvent, TransportEvent, TransportHandle, TransportSender,
};

use crate::status::StatusCell;

/// Connector that opens one WebSocket per handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a new WebSocket connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    type Handle = WebSocketHandle;

    fn connect(&self, target: ConnectTarget, events: TransportSender) -> WebSocketHandle {
        let id = ConnectionId::next();
        let status = StatusCell::new(ConnectionStatus::Connecting);
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reporter = Reporter { id, events };
        reporter.status(ConnectionStatus::Connecting);

        let connection = Connection {
            url: target.endpoint,
            status: status.clone(),
            reporter,
            outgoing: outgoing_rx,
            shutdown: shutdown_rx,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(connection.run());
            }
            Err(e) => {
                tracing::error!(connection = %id, "No runtime to drive WebSocket: {e}");
                connection.finish(Some(format!("websocket error: {e}")));
            }
        }

        WebSocketHandle {
            id,
            status,
            outgoing: outgoing_tx,
            shutdown: shutdown_tx,
        }
    }
}

/// Handle to one WebSocket connection.
///
/// Dropping the handle without calling [`TransportHandle::close`] also ends
/// the connection, since the driving task loses its command channel.
#[derive(Debug)]
pub struct WebSocketHandle {
    id: ConnectionId,
    status: StatusCell,
    outgoing: mpsc::UnboundedSender<ClientCommand>,
    shutdown: watch::Sender<bool>,
}

impl TransportHandle for WebSocketHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    fn try_send(&self, command: ClientCommand) -> Result<(), SendError> {
        if *self.shutdown.borrow() || self.status.get() != ConnectionStatus::Open {
            return Err(SendError::NotConnected);
        }
        self.outgoing
            .send(command)
            .map_err(|_| SendError::ChannelClosed)
    }

    fn close(&self) {
        self.shutdown.send_replace(true);
    }
}

struct Reporter {
    id: ConnectionId,
    events: TransportSender,
}

impl Reporter {
    fn status(&self, status: ConnectionStatus) {
        tracing::debug!(connection = %self.id, %status, "Connection status");
        let _ = self.events.send(TransportEvent::status(self.id, status));
    }

    fn event(&self, event: ServerEvent) {
        let _ = self.events.send(TransportEvent::event(self.id, event));
    }
}

/// Resolves once shutdown is requested or every handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // The borrow guard is not `Send`; drop it before returning.
    let _ = shutdown.wait_for(|closed| *closed).await;
}

struct Connection {
    url: String,
    status: StatusCell,
    reporter: Reporter,
    outgoing: mpsc::UnboundedReceiver<ClientCommand>,
    shutdown: watch::Receiver<bool>,
}

impl Connection {
    async fn run(mut self) {
        tracing::info!(connection = %self.reporter.id, url = %self.url, "Connecting to chat server");

        let connected = tokio::select! {
            result = connect_async(self.url.as_str()) => Some(result),
            () = shutdown_requested(&mut self.shutdown) => None,
        };

        let socket = match connected {
            Some(Ok((socket, _))) => socket,
            Some(Err(e)) => {
                tracing::warn!(connection = %self.reporter.id, "WebSocket connect failed: {e}");
                self.finish(Some(format!("websocket error: {e}")));
                return;
            }
            // Closed while connecting.
            None => {
                self.finish(None);
                return;
            }
        };

        if !self.status.open() {
            self.finish(None);
            return;
        }
        self.reporter.status(ConnectionStatus::Open);

        let (mut sender, mut receiver) = socket.split();

        loop {
            tokio::select! {
                msg = receiver.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => {
                                self.reporter.event(ServerEvent::error("invalid event: binary frame is not UTF-8"));
                                continue;
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(connection = %self.reporter.id, "Server closed connection");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::error!(connection = %self.reporter.id, "WebSocket error: {e}");
                            self.reporter.event(ServerEvent::error(format!("websocket error: {e}")));
                            break;
                        }
                    };
                    self.reporter.event(ServerEvent::decode(&text));
                }
                Some(command) = self.outgoing.recv() => {
                    let frame = match command.encode() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!("Failed to serialize command: {e}");
                            self.reporter.event(ServerEvent::error(e.to_string()));
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(frame.into())).await {
                        tracing::error!(connection = %self.reporter.id, "Failed to send frame: {e}");
                        self.reporter.event(ServerEvent::error(format!("websocket error: {e}")));
                        break;
                    }
                }
                () = shutdown_requested(&mut self.shutdown) => {
                    let _ = sender.close().await;
                    break;
                }
            }
        }

        self.finish(None);
    }

    /// Report an optional fault, then `closed`. Consumes the connection so
    /// nothing can be reported afterwards.
    fn finish(self, fault: Option<String>) {
        if let Some(text) = fault {
            self.reporter.event(ServerEvent::error(text));
        }
        self.status.close();
        self.reporter.status(ConnectionStatus::Closed);
    }
}
