//! Room protocol state machine.
//!
//! ```text
//!   Connecting ──transport open──▶ Joining ──room-info──▶ Synchronized
//!        │                           │                        │
//!        └──────── rejection / room-full / room-closed ───────┘
//!                                    │
//!                                    ▼
//!                             Closed(reason)        (terminal)
//! ```
//!
//! `RoomSession` owns the roster and the sync tracker and interprets every
//! inbound [`ServerEvent`] against the local surface. It never touches the
//! transport: the caller feeds it decoded events and sends back whatever
//! [`ClientEvent`] it returns. That keeps the whole protocol testable
//! without a socket.
//!
//! Handshake rejections arrive as free-form reason text; they are
//! classified by substring into a canonical [`CloseReason`] so the caller
//! can present a stable message regardless of server wording drift.

use log::{debug, info, warn};
use syncdocs_core::RenderSurface;

use crate::presence::PresenceRegistry;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::sync::SyncTracker;

/// Why a session reached the terminal `Closed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The owner ended the session while we were in the room.
    OwnerClosed(String),
    /// The room was at capacity and the join was not admitted.
    RoomFull(String),
    /// The room id resolved to nothing, or its owner is not connected.
    OwnerOffline,
    /// The share key in the join request did not match.
    InvalidShareKey,
    /// The room requires a signed-in member and no credentials were sent.
    AuthRequired,
    /// A rejection whose reason text matched no known category.
    Rejected(String),
    /// The transport failed outside the protocol (I/O, close frame).
    Transport(String),
}

impl CloseReason {
    /// User-facing text for this reason.
    pub fn message(&self) -> String {
        match self {
            CloseReason::OwnerClosed(m) | CloseReason::RoomFull(m) | CloseReason::Rejected(m) => {
                m.clone()
            }
            CloseReason::OwnerOffline => {
                "This room does not exist or the owner is offline.".to_string()
            }
            CloseReason::InvalidShareKey => "The share link is invalid or has expired.".to_string(),
            CloseReason::AuthRequired => "You must be signed in to join this room.".to_string(),
            CloseReason::Transport(m) => m.clone(),
        }
    }
}

/// Map a handshake rejection's reason text onto a canonical close reason.
/// Matching is case-insensitive substring; unmatched text passes through.
pub fn classify_rejection(message: &str) -> CloseReason {
    let lower = message.to_lowercase();
    if lower.contains("owner offline") {
        CloseReason::OwnerOffline
    } else if lower.contains("invalid room key") {
        CloseReason::InvalidShareKey
    } else if lower.contains("authentication required") {
        CloseReason::AuthRequired
    } else {
        CloseReason::Rejected(message.to_string())
    }
}

/// Lifecycle of a room session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    /// Transport handshake in flight.
    Connecting,
    /// Join request sent, waiting for the `room-info` snapshot.
    Joining,
    /// Snapshot applied; ticking and applying inbound deltas.
    Synchronized,
    /// Terminal. All further events are ignored.
    Closed(CloseReason),
}

/// One client's view of a room: roster, sync tracker, protocol state.
#[derive(Debug)]
pub struct RoomSession {
    document_id: String,
    state: RoomState,
    presence: PresenceRegistry,
    tracker: SyncTracker,
}

impl RoomSession {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            state: RoomState::Connecting,
            presence: PresenceRegistry::new(),
            tracker: SyncTracker::new(),
        }
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Edits are only meaningful while synchronized; before the snapshot
    /// there is nothing to diff against, after close the room is read-only.
    pub fn is_editable(&self) -> bool {
        matches!(self.state, RoomState::Synchronized)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, RoomState::Closed(_))
    }

    /// Transport handshake completed: emit the join request.
    pub fn on_transport_open(&mut self) -> ClientEvent {
        debug!("transport open, joining room {}", self.document_id);
        self.state = RoomState::Joining;
        ClientEvent::JoinRoom {
            document_id: self.document_id.clone(),
        }
    }

    /// The transport died outside the protocol.
    pub fn on_transport_error(&mut self, message: impl Into<String>) {
        if !self.is_closed() {
            self.state = RoomState::Closed(CloseReason::Transport(message.into()));
        }
    }

    /// Run one sampling tick. Silent unless synchronized.
    pub fn tick<S: RenderSurface + ?Sized>(&mut self, surface: &S) -> Option<ClientEvent> {
        if !self.is_editable() {
            return None;
        }
        self.tracker.tick(surface)
    }

    /// Interpret one inbound event against the surface. Returns a reply
    /// to send, if the protocol calls for one.
    pub fn handle_event<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        event: ServerEvent,
    ) -> Option<ClientEvent> {
        if self.is_closed() {
            debug!("room closed, dropping inbound event");
            return None;
        }

        match event {
            ServerEvent::RoomInfo {
                content,
                participants,
                self_id,
                version,
            } => {
                info!(
                    "room-info: {} chars, {} participants, version {}",
                    content.chars().count(),
                    participants.len(),
                    version
                );
                surface.set_content(&content);
                self.tracker.reset(&content, version);
                self.presence.replace_all(participants, self_id);
                self.state = RoomState::Synchronized;
                None
            }
            ServerEvent::UserJoined { user } => {
                debug!("user joined: {} ({})", user.name, user.id);
                self.presence.add(user);
                None
            }
            ServerEvent::UserLeft { id } => {
                debug!("user left: {id}");
                self.presence.remove(&id);
                None
            }
            ServerEvent::DocUpdated {
                delta,
                base_version,
            } => {
                if !self.is_editable() {
                    warn!("doc-updated before snapshot, dropping");
                    return None;
                }
                if base_version != self.tracker.version() {
                    warn!(
                        "doc-updated base version {} != local {}, requesting resync",
                        base_version,
                        self.tracker.version()
                    );
                    return Some(ClientEvent::ResyncRequest);
                }
                surface.replace_range(delta.start, delta.end, &delta.content);
                self.tracker.record_remote_apply(&surface.content());
                None
            }
            ServerEvent::CursorUpdated { id, position, .. } => {
                self.presence.update_cursor(&id, position);
                None
            }
            ServerEvent::RoomClosed { message } => {
                info!("room closed by owner: {message}");
                self.state = RoomState::Closed(CloseReason::OwnerClosed(message));
                None
            }
            ServerEvent::RoomFull { message } => {
                info!("room full: {message}");
                self.state = RoomState::Closed(CloseReason::RoomFull(message));
                None
            }
            ServerEvent::ConnectionRejected { message } => {
                let reason = classify_rejection(&message);
                info!("connection rejected: {message} -> {reason:?}");
                self.state = RoomState::Closed(reason);
                None
            }
        }
    }
}
