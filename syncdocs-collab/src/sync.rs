//! Fixed-interval synchronization tracker.
//!
//! Every tick samples the surface and decides the minimum message to emit:
//!
//! ```text
//!                    cursor changed?
//!                      no        yes
//! content   no        (silent)   cursor-change
//! changed?  yes       doc-delta  doc-and-cursor-change (bundled)
//! ```
//!
//! Bundling is preferred whenever both changed in the same tick: a single
//! message lets the remote apply delta and cursor atomically instead of
//! observing a window where the delta landed while the cursor is stale.
//!
//! The tracker owns the snapshot reference — the last buffer state known
//! to be reconciled with the session. It advances only after a content
//! emit here, or after the room protocol applies an inbound delta or
//! snapshot; at both points it equals the buffer exactly.

use std::time::Duration;

use syncdocs_core::{compute_delta, RenderSurface};

use crate::protocol::ClientEvent;

/// Sampling period of the synchronization loop. A latency/bandwidth
/// trade-off, not a correctness constant.
pub const TICK_INTERVAL: Duration = Duration::from_millis(330);

/// Last cursor value actually sent. `Unset` is a sentinel distinct from
/// every valid value, including offset 0 and "no caret".
#[derive(Debug, Clone, PartialEq, Eq)]
enum SentCursor {
    Unset,
    Sent(Option<usize>),
}

/// Tracks what the session last saw of our local state.
#[derive(Debug)]
pub struct SyncTracker {
    snapshot: String,
    version: u64,
    last_sent_cursor: SentCursor,
}

impl Default for SyncTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTracker {
    pub fn new() -> Self {
        Self {
            snapshot: String::new(),
            version: 0,
            last_sent_cursor: SentCursor::Unset,
        }
    }

    /// The snapshot reference.
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Current document version the snapshot corresponds to.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Reset to a freshly received full snapshot (room-info).
    pub fn reset(&mut self, content: &str, version: u64) {
        self.snapshot = content.to_string();
        self.version = version;
    }

    /// Advance after the room protocol applied an inbound delta to the
    /// buffer. `content` is the post-apply buffer.
    pub fn record_remote_apply(&mut self, content: &str) {
        self.snapshot = content.to_string();
        self.version += 1;
    }

    /// Sample the surface and decide what, if anything, to emit.
    ///
    /// On a content-bearing emit the snapshot advances to the just-sent
    /// buffer and the version increments; on a cursor-bearing emit the
    /// last-sent cursor advances. At most one message per tick.
    pub fn tick<S: RenderSurface + ?Sized>(&mut self, surface: &S) -> Option<ClientEvent> {
        let buffer = surface.content();
        let cursor = surface.caret_offset();

        let content_changed = buffer != self.snapshot;
        let cursor_changed = match &self.last_sent_cursor {
            // Nothing ever sent and no caret to report: nothing to clear
            // remotely, stay silent.
            SentCursor::Unset => cursor.is_some(),
            SentCursor::Sent(prev) => *prev != cursor,
        };

        let event = match (content_changed, cursor_changed) {
            (false, false) => return None,
            (false, true) => ClientEvent::CursorChange { position: cursor },
            (true, false) => ClientEvent::DocDeltaChange {
                delta: compute_delta(&self.snapshot, &buffer),
                base_version: self.version,
            },
            (true, true) => ClientEvent::DocAndCursorChange {
                delta: compute_delta(&self.snapshot, &buffer),
                base_version: self.version,
                position: cursor,
            },
        };

        if content_changed {
            self.snapshot = buffer;
            self.version += 1;
        }
        if cursor_changed {
            self.last_sent_cursor = SentCursor::Sent(cursor);
        }

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdocs_core::{Delta, FixedGridSurface};

    #[test]
    fn test_idle_tick_emits_nothing() {
        let mut tracker = SyncTracker::new();
        tracker.reset("<p>A</p>", 0);
        let surface = FixedGridSurface::new("<p>A</p>");
        assert_eq!(tracker.tick(&surface), None);
        assert_eq!(tracker.tick(&surface), None);
    }

    #[test]
    fn test_unset_cursor_outside_surface_stays_silent() {
        let mut tracker = SyncTracker::new();
        tracker.reset("<p>A</p>", 0);
        let surface = FixedGridSurface::new("<p>A</p>");
        // Caret never placed, nothing ever sent: no cursor-change(null).
        assert_eq!(surface.caret_offset(), None);
        assert_eq!(tracker.tick(&surface), None);
    }

    #[test]
    fn test_three_tick_scenario() {
        let mut tracker = SyncTracker::new();
        tracker.reset("Hello", 0);
        let mut surface = FixedGridSurface::new("Hello");

        // Tick 1: buffer unchanged, cursor moves from unset to 3.
        surface.set_caret(Some(3));
        assert_eq!(
            tracker.tick(&surface),
            Some(ClientEvent::CursorChange { position: Some(3) })
        );

        // Tick 2: buffer changes, cursor still at the last *sent* value.
        surface.set_content("Hell");
        match tracker.tick(&surface) {
            Some(ClientEvent::DocDeltaChange { delta, base_version }) => {
                assert_eq!(delta, Delta { start: 4, end: 5, content: String::new() });
                assert_eq!(base_version, 0);
            }
            other => panic!("expected doc-delta-change, got {other:?}"),
        }
        assert_eq!(tracker.snapshot(), "Hell");
        assert_eq!(tracker.version(), 1);

        // Tick 3: both change — exactly one bundled event.
        surface.set_content("Hello!");
        surface.set_caret(Some(6));
        match tracker.tick(&surface) {
            Some(ClientEvent::DocAndCursorChange { delta, base_version, position }) => {
                assert_eq!(delta.content, "o!");
                assert_eq!(base_version, 1);
                assert_eq!(position, Some(6));
            }
            other => panic!("expected bundled event, got {other:?}"),
        }

        // Tick 4: quiescent again.
        assert_eq!(tracker.tick(&surface), None);
    }

    #[test]
    fn test_cursor_zero_differs_from_unset() {
        let mut tracker = SyncTracker::new();
        tracker.reset("abc", 0);
        let mut surface = FixedGridSurface::new("abc");
        surface.set_caret(Some(0));
        assert_eq!(
            tracker.tick(&surface),
            Some(ClientEvent::CursorChange { position: Some(0) })
        );
        // Same offset again: already the last sent value.
        assert_eq!(tracker.tick(&surface), None);
    }

    #[test]
    fn test_cursor_leaving_surface_after_send_is_a_change() {
        let mut tracker = SyncTracker::new();
        tracker.reset("abc", 0);
        let mut surface = FixedGridSurface::new("abc");
        surface.set_caret(Some(1));
        tracker.tick(&surface);

        surface.set_caret(None);
        assert_eq!(
            tracker.tick(&surface),
            Some(ClientEvent::CursorChange { position: None })
        );
    }

    #[test]
    fn test_snapshot_advances_only_on_content_emit() {
        let mut tracker = SyncTracker::new();
        tracker.reset("a", 3);
        let mut surface = FixedGridSurface::new("a");

        surface.set_caret(Some(1));
        tracker.tick(&surface); // cursor only
        assert_eq!(tracker.snapshot(), "a");
        assert_eq!(tracker.version(), 3);

        surface.set_content("ab");
        tracker.tick(&surface);
        assert_eq!(tracker.snapshot(), "ab");
        assert_eq!(tracker.version(), 4);
    }

    #[test]
    fn test_record_remote_apply_advances() {
        let mut tracker = SyncTracker::new();
        tracker.reset("<p>A</p>", 2);
        tracker.record_remote_apply("<p>AB</p>");
        assert_eq!(tracker.snapshot(), "<p>AB</p>");
        assert_eq!(tracker.version(), 3);

        // Buffer now matches the snapshot: no spurious echo next tick.
        let surface = FixedGridSurface::new("<p>AB</p>");
        let mut t = tracker;
        assert_eq!(t.tick(&surface), None);
    }
}
