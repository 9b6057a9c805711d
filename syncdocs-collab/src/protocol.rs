//! Wire protocol for the shared-session transport.
//!
//! Events travel as JSON text frames, one tagged object per frame:
//!
//! ```text
//! {"event":"doc-delta-change","delta":{"start":3,"end":5,"content":"x"},"baseVersion":7}
//! ```
//!
//! The closed set of inbound events is a single tagged enum dispatched
//! through one handler (`RoomSession::handle_event`) rather than ad hoc
//! callback registration, so each frame is handled exactly once.
//!
//! Content-bearing events carry `baseVersion`: the document version the
//! delta was computed against. The room protocol rejects deltas whose base
//! does not match the local snapshot version instead of applying blindly.

use serde::{Deserialize, Serialize};
use syncdocs_core::Delta;

/// Connection-scoped participant identifier. Not stable across reconnects.
pub type ParticipantId = String;

/// One connected identity within a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Marks the session owner. At most one per room.
    #[serde(default)]
    pub is_primary: bool,
    /// Live caret offset in characters, when known.
    #[serde(default)]
    pub cursor_position: Option<usize>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_primary: false,
            cursor_position: None,
        }
    }

    pub fn owner(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self { is_primary: true, ..Self::new(id, name) }
    }
}

/// Join credentials, presented once at connect time. Mutually exclusive:
/// a bearer credential for an authenticated user, or a room-scoped share
/// key for an anonymous participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinAuth {
    Bearer(String),
    ShareKey(String),
}

impl JoinAuth {
    /// Query parameter carrying this credential on the connect URL.
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            JoinAuth::Bearer(token) => ("token", token),
            JoinAuth::ShareKey(key) => ("key", key),
        }
    }
}

/// Events emitted by this client toward the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join request sent once after the transport handshake succeeds.
    #[serde(rename_all = "camelCase")]
    JoinRoom { document_id: String },

    /// Content changed this tick, cursor did not.
    #[serde(rename_all = "camelCase")]
    DocDeltaChange { delta: Delta, base_version: u64 },

    /// Cursor changed this tick, content did not. `position: null` means
    /// the caret left the editable surface.
    CursorChange { position: Option<usize> },

    /// Both changed in the same tick: one bundled message so the remote
    /// end applies delta and cursor atomically, with no window where the
    /// delta lands while the cursor is stale.
    #[serde(rename_all = "camelCase")]
    DocAndCursorChange {
        delta: Delta,
        base_version: u64,
        position: Option<usize>,
    },

    /// Local state diverged from the session (base-version mismatch on an
    /// inbound delta); asks the server for a fresh `room-info` snapshot.
    ResyncRequest,
}

/// Events delivered by the session to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First authoritative response after joining: the full snapshot.
    #[serde(rename_all = "camelCase")]
    RoomInfo {
        content: String,
        participants: Vec<Participant>,
        self_id: ParticipantId,
        version: u64,
    },

    UserJoined { user: Participant },

    UserLeft { id: ParticipantId },

    #[serde(rename_all = "camelCase")]
    DocUpdated { delta: Delta, base_version: u64 },

    CursorUpdated {
        id: ParticipantId,
        name: String,
        position: Option<usize>,
    },

    /// Owner disconnected; the room is terminal and read-only.
    RoomClosed { message: String },

    /// Room at capacity; the join was not admitted.
    RoomFull { message: String },

    /// Handshake-level rejection carrying the server's reason text.
    ConnectionRejected { message: String },
}

impl ClientEvent {
    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

impl ServerEvent {
    /// Parse a JSON text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    Serialization(String),
    Deserialization(String),
    ConnectionClosed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialization(e) => write!(f, "Deserialization error: {e}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_wire_protocol() {
        let join = ClientEvent::JoinRoom { document_id: "doc-1".into() };
        let frame = join.encode().unwrap();
        assert!(frame.contains("\"event\":\"join-room\""));
        assert!(frame.contains("\"documentId\":\"doc-1\""));

        let bundled = ClientEvent::DocAndCursorChange {
            delta: Delta { start: 0, end: 0, content: "x".into() },
            base_version: 3,
            position: Some(1),
        };
        let frame = bundled.encode().unwrap();
        assert!(frame.contains("\"event\":\"doc-and-cursor-change\""));
        assert!(frame.contains("\"baseVersion\":3"));
    }

    #[test]
    fn test_room_info_decodes() {
        let frame = r#"{
            "event": "room-info",
            "content": "<p>A</p>",
            "participants": [
                {"id": "p1", "name": "Lion", "isPrimary": true},
                {"id": "p2", "name": "Tiger"}
            ],
            "selfId": "p1",
            "version": 4
        }"#;
        let event = ServerEvent::decode(frame).unwrap();
        match event {
            ServerEvent::RoomInfo { content, participants, self_id, version } => {
                assert_eq!(content, "<p>A</p>");
                assert_eq!(participants.len(), 2);
                assert!(participants[0].is_primary);
                assert!(!participants[1].is_primary);
                assert_eq!(participants[1].cursor_position, None);
                assert_eq!(self_id, "p1");
                assert_eq!(version, 4);
            }
            other => panic!("expected room-info, got {other:?}"),
        }
    }

    #[test]
    fn test_cursor_change_null_position() {
        let event = ClientEvent::CursorChange { position: None };
        let frame = event.encode().unwrap();
        assert!(frame.contains("\"position\":null"));
    }

    #[test]
    fn test_unknown_event_is_error() {
        let err = ServerEvent::decode(r#"{"event":"doc-load","content":""}"#);
        assert!(err.is_err());
        let err = ServerEvent::decode("not json");
        assert!(err.is_err());
    }

    #[test]
    fn test_join_auth_query_params() {
        let bearer = JoinAuth::Bearer("jwt-abc".into());
        assert_eq!(bearer.query_param(), ("token", "jwt-abc"));
        let key = JoinAuth::ShareKey("share-xyz".into());
        assert_eq!(key.query_param(), ("key", "share-xyz"));
    }
}
