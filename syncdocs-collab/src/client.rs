//! WebSocket session driver.
//!
//! Owns a single task that multiplexes the two sources of work:
//!
//! ```text
//!   ┌───────────────── driver task ──────────────────┐
//!   │  select! {                                      │
//!   │    interval tick  ──▶ tracker sample ──▶ send   │
//!   │    inbound frame  ──▶ RoomSession     ──▶ send  │
//!   │    shutdown       ──▶ close frame, exit         │
//!   │  }                                              │
//!   └─────────────────────────────────────────────────┘
//! ```
//!
//! Because one task owns both the tick and the inbound stream, a tick
//! never interleaves with an event handler, and `leave()` tears both
//! down as a unit. The application observes the session through a
//! [`SessionEvent`] channel and mutates the document only through the
//! shared surface.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;

use syncdocs_core::RenderSurface;

use crate::protocol::{ClientEvent, JoinAuth, ParticipantId, ProtocolError, ServerEvent};
use crate::room::{CloseReason, RoomSession, RoomState};
use crate::sync::TICK_INTERVAL;

/// Connection and sampling parameters for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:9090/sync`.
    pub server_url: String,
    /// Room to join.
    pub document_id: String,
    /// Credentials, if the room is private or link-shared.
    pub auth: Option<JoinAuth>,
    /// Sampling period; adjustable for tests.
    pub tick_interval: Duration,
}

impl SessionConfig {
    pub fn new(server_url: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            document_id: document_id.into(),
            auth: None,
            tick_interval: TICK_INTERVAL,
        }
    }

    pub fn with_auth(mut self, auth: JoinAuth) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// Notifications delivered to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The `room-info` snapshot was applied; the surface holds the
    /// authoritative content and editing is live.
    Joined { self_id: ParticipantId },
    /// A remote edit was applied to the surface.
    RemoteEdit,
    /// The roster or a remote cursor changed.
    RosterChanged,
    /// Terminal. Emitted exactly once, then the channel closes.
    Closed(CloseReason),
}

/// Errors surfaced to the caller of [`connect`].
#[derive(Debug)]
pub enum ClientError {
    /// The WebSocket handshake failed.
    Connect(String),
    /// A frame could not be encoded.
    Protocol(ProtocolError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Connect(m) => write!(f, "connection failed: {m}"),
            ClientError::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        ClientError::Protocol(e)
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl SessionHandle {
    /// Next session notification. `None` after the driver has exited.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Leave the room: stops the tick and closes the transport as one
    /// unit, then waits for the driver to finish.
    pub async fn leave(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

fn join_url(config: &SessionConfig) -> String {
    let mut url = format!("{}?doc={}", config.server_url, config.document_id);
    if let Some(auth) = &config.auth {
        let (key, value) = auth.query_param();
        url.push('&');
        url.push_str(key);
        url.push('=');
        url.push_str(value);
    }
    url
}

/// Connect to the server, join the room, and spawn the driver task.
///
/// The surface is shared with the application; the driver locks it per
/// tick and per inbound event, never across an await on the transport.
pub async fn connect<S>(
    config: SessionConfig,
    surface: Arc<Mutex<S>>,
) -> Result<SessionHandle, ClientError>
where
    S: RenderSurface + Send + 'static,
{
    let url = join_url(&config);
    info!("connecting to {url}");
    let (ws, _response) = tokio_tungstenite::connect_async(&url)
        .await
        .map_err(|e| ClientError::Connect(e.to_string()))?;
    let (mut sink, stream) = ws.split();

    let mut session = RoomSession::new(&config.document_id);
    let join = session.on_transport_open();
    sink.send(Message::Text(join.encode()?.into()))
        .await
        .map_err(|e| ClientError::Connect(e.to_string()))?;

    let (event_tx, event_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(drive(
        session,
        surface,
        sink,
        stream,
        config.tick_interval,
        event_tx,
        shutdown_rx,
    ));

    Ok(SessionHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
        event_rx,
    })
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn send_event(sink: &mut WsSink, event: &ClientEvent) -> Result<(), String> {
    let frame = event.encode().map_err(|e| e.to_string())?;
    sink.send(Message::Text(frame.into()))
        .await
        .map_err(|e| e.to_string())
}

async fn drive<S: RenderSurface + Send + 'static>(
    mut session: RoomSession,
    surface: Arc<Mutex<S>>,
    mut sink: WsSink,
    mut stream: WsStream,
    tick_interval: Duration,
    event_tx: mpsc::Sender<SessionEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("leave requested, closing transport");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ = interval.tick() => {
                let outgoing = {
                    let guard = surface.lock().await;
                    session.tick(&*guard)
                };
                if let Some(event) = outgoing {
                    if let Err(e) = send_event(&mut sink, &event).await {
                        session.on_transport_error(e);
                        break;
                    }
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let event = match ServerEvent::decode(text.as_str()) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!("undecodable frame: {e}");
                                continue;
                            }
                        };
                        let notification = notification_for(&session, &event);
                        let reply = {
                            let mut guard = surface.lock().await;
                            session.handle_event(&mut *guard, event)
                        };
                        if let Some(n) = notification_after(notification, &reply) {
                            let _ = event_tx.send(n).await;
                        }
                        if let Some(reply) = reply {
                            if let Err(e) = send_event(&mut sink, &reply).await {
                                session.on_transport_error(e);
                                break;
                            }
                        }
                        if session.is_closed() {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        session.on_transport_error("connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        session.on_transport_error(e.to_string());
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let RoomState::Closed(reason) = session.state() {
        let _ = event_tx.send(SessionEvent::Closed(reason.clone())).await;
    }
}

/// Decide, before dispatch, which notification this event will warrant.
fn notification_for(session: &RoomSession, event: &ServerEvent) -> Option<SessionEvent> {
    match event {
        ServerEvent::RoomInfo { self_id, .. } if !session.is_editable() => {
            Some(SessionEvent::Joined {
                self_id: self_id.clone(),
            })
        }
        ServerEvent::RoomInfo { .. } => None,
        ServerEvent::DocUpdated { .. } => Some(SessionEvent::RemoteEdit),
        ServerEvent::UserJoined { .. }
        | ServerEvent::UserLeft { .. }
        | ServerEvent::CursorUpdated { .. } => Some(SessionEvent::RosterChanged),
        // Terminal events are reported once, after the driver exits.
        ServerEvent::RoomClosed { .. }
        | ServerEvent::RoomFull { .. }
        | ServerEvent::ConnectionRejected { .. } => None,
    }
}

/// Suppress the pre-computed notification when dispatch went another way
/// (a version-mismatched delta was dropped rather than applied).
fn notification_after(
    notification: Option<SessionEvent>,
    reply: &Option<ClientEvent>,
) -> Option<SessionEvent> {
    match notification {
        Some(SessionEvent::RemoteEdit) if matches!(reply, Some(ClientEvent::ResyncRequest)) => {
            None
        }
        other => other,
    }
}
