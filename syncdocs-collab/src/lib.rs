//! # syncdocs-collab — Real-time room client for SyncDocs
//!
//! Client-side engine for multi-participant document rooms: joins a room
//! over WebSocket, keeps the local render surface reconciled with the
//! session through content deltas, and maintains a live roster with
//! projected remote cursors.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   tick (330ms)   ┌─────────────┐   JSON text    ┌────────┐
//! │ RenderSurface│ ◄──────────────► │ RoomSession │ ◄────────────► │ Server │
//! │ (app-owned)  │  delta / cursor  │  + tracker  │    WebSocket   │        │
//! └──────┬───────┘                  └──────┬──────┘                └────────┘
//!        │                                 │
//!        ▼                                 ▼
//! ┌──────────────┐                  ┌──────────────────┐
//! │ RemoteCursor │ ◄──────────────  │ PresenceRegistry │
//! │ (rendering)  │    projection    │ (sorted roster)  │
//! └──────────────┘                  └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON wire events (tagged `ClientEvent`/`ServerEvent`)
//! - [`sync`] — fixed-interval change tracker (delta, cursor, bundling)
//! - [`room`] — protocol state machine and close-reason classification
//! - [`presence`] — roster, name colors, remote cursor projection
//! - [`client`] — tokio WebSocket driver (one task, `select!` loop)

pub mod client;
pub mod presence;
pub mod protocol;
pub mod room;
pub mod sync;

// Re-exports for convenience
pub use client::{connect, ClientError, SessionConfig, SessionEvent, SessionHandle};
pub use presence::{
    color_for, initial_for, NameColor, PresenceRegistry, RemoteCursor, DEFAULT_COLOR,
};
pub use protocol::{
    ClientEvent, JoinAuth, Participant, ParticipantId, ProtocolError, ServerEvent,
};
pub use room::{classify_rejection, CloseReason, RoomSession, RoomState};
pub use sync::{SyncTracker, TICK_INTERVAL};
