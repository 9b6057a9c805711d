//! Participant roster and remote-cursor presence.
//!
//! The registry is a plain in-memory roster keyed by connection-scoped id.
//! Color and initial derivation are pure functions of the display name so
//! every client renders a given participant identically with no extra
//! coordination.
//!
//! Color assignment is a two-tier scheme carried over from the product's
//! established palette: a fixed table maps the closed set of canonical
//! animal display names to assigned colors, and any other name falls back
//! to a single neutral default. Tests depend on exact assignments for the
//! named fixtures, so this table is contract, not implementation detail.

use syncdocs_core::{project_offset, CursorRect, RenderSurface};

use crate::protocol::{Participant, ParticipantId};

/// A display color: CSS utility class plus raw hex, as consumed by the
/// rendering layer's avatar and caret widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameColor {
    pub swatch: &'static str,
    pub hex: &'static str,
}

/// Neutral fallback for names outside the canonical table.
pub const DEFAULT_COLOR: NameColor = NameColor { swatch: "bg-gray-500", hex: "#6B7280" };

/// Deterministic color for a display name.
///
/// Exact-match lookup over the canonical identities; everything else gets
/// [`DEFAULT_COLOR`].
pub fn color_for(name: &str) -> NameColor {
    match name {
        "Lion" => NameColor { swatch: "bg-amber-500", hex: "#F59E0B" },
        "Tiger" => NameColor { swatch: "bg-blue-500", hex: "#3B82F6" },
        "Hippo" => NameColor { swatch: "bg-red-500", hex: "#EF4444" },
        "Zebra" => NameColor { swatch: "bg-green-500", hex: "#10B981" },
        "Rhino" => NameColor { swatch: "bg-purple-500", hex: "#8B5CF6" },
        "Panda" => NameColor { swatch: "bg-pink-500", hex: "#EC4899" },
        "Eagle" => NameColor { swatch: "bg-gray-500", hex: "#6B7280" },
        "Koala" => NameColor { swatch: "bg-cyan-600", hex: "#06B6D4" },
        "Falcon" => NameColor { swatch: "bg-indigo-500", hex: "#6366F1" },
        "Dolphin" => NameColor { swatch: "bg-teal-500", hex: "#14B8A6" },
        _ => DEFAULT_COLOR,
    }
}

/// Avatar initial for a display name: first character, uppercased, `?`
/// for an empty name.
pub fn initial_for(name: &str) -> char {
    name.chars()
        .next()
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('?')
}

/// Everything needed to draw one remote participant's caret: the bar
/// rectangle plus name tag and color.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub id: ParticipantId,
    pub name: String,
    pub color: NameColor,
    pub rect: CursorRect,
}

/// In-memory roster of session participants.
///
/// Insertion order is preserved; it is the final tiebreak in the display
/// sort, since display names are not guaranteed unique.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    participants: Vec<Participant>,
    self_id: Option<ParticipantId>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole roster from a snapshot, along with our own
    /// assigned id.
    pub fn replace_all(&mut self, participants: Vec<Participant>, self_id: ParticipantId) {
        self.participants = participants;
        self.self_id = Some(self_id);
    }

    /// Append a participant on join. A duplicate id replaces the existing
    /// entry in place.
    pub fn add(&mut self, participant: Participant) {
        if let Some(existing) = self.participants.iter_mut().find(|p| p.id == participant.id) {
            *existing = participant;
        } else {
            self.participants.push(participant);
        }
    }

    /// Remove a participant on leave. Dropping the entry also discards any
    /// cached cursor for that id.
    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(index))
    }

    /// Update a participant's live caret offset.
    pub fn update_cursor(&mut self, id: &str, position: Option<usize>) -> bool {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.cursor_position = position;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Our own connection-scoped id, known once the snapshot has arrived.
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Display order: self first, then owner(s), then the rest
    /// alphabetically by name. Equal names keep registry insertion order
    /// (the sort is stable), so the order is a deterministic total order.
    pub fn sorted(&self) -> Vec<&Participant> {
        let mut ordered: Vec<&Participant> = self.participants.iter().collect();
        let self_id = self.self_id.as_deref();
        ordered.sort_by(|a, b| {
            let a_self = Some(a.id.as_str()) == self_id;
            let b_self = Some(b.id.as_str()) == self_id;
            b_self
                .cmp(&a_self)
                .then(b.is_primary.cmp(&a.is_primary))
                .then_with(|| a.name.cmp(&b.name))
        });
        ordered
    }

    /// Project every remote participant's caret against the surface.
    ///
    /// Participants with no reported cursor, our own entry, and offsets the
    /// surface cannot resolve (stale reports racing a delta) are skipped —
    /// an unresolvable cursor simply does not render this pass and is
    /// expected to reappear once state catches up.
    pub fn remote_cursors<S: RenderSurface + ?Sized>(&self, surface: &S) -> Vec<RemoteCursor> {
        let self_id = self.self_id.as_deref();
        self.participants
            .iter()
            .filter(|p| Some(p.id.as_str()) != self_id)
            .filter_map(|p| {
                let offset = p.cursor_position?;
                let rect = project_offset(surface, offset)?;
                Some(RemoteCursor {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    color: color_for(&p.name),
                    rect,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdocs_core::FixedGridSurface;

    #[test]
    fn test_color_table_fixtures() {
        assert_eq!(color_for("Lion").hex, "#F59E0B");
        assert_eq!(color_for("Tiger").hex, "#3B82F6");
        assert_eq!(color_for("Dolphin").hex, "#14B8A6");
        assert_eq!(color_for("Tiger").swatch, "bg-blue-500");
    }

    #[test]
    fn test_unknown_name_gets_default() {
        assert_eq!(color_for("Wombat"), DEFAULT_COLOR);
        assert_eq!(color_for(""), DEFAULT_COLOR);
        // Exact match only: no case folding.
        assert_eq!(color_for("lion"), DEFAULT_COLOR);
    }

    #[test]
    fn test_initial_derivation() {
        assert_eq!(initial_for("Tiger"), 'T');
        assert_eq!(initial_for("zebra"), 'Z');
        assert_eq!(initial_for(""), '?');
    }

    #[test]
    fn test_sort_places_self_first() {
        let mut registry = PresenceRegistry::new();
        registry.replace_all(
            vec![
                Participant::new("x", "Zebra"),
                Participant::owner("self", "Lion"),
            ],
            "self".into(),
        );
        let ordered = registry.sorted();
        assert_eq!(ordered[0].id, "self");
        assert_eq!(ordered[1].id, "x");
    }

    #[test]
    fn test_sort_owner_before_guests() {
        let mut registry = PresenceRegistry::new();
        registry.replace_all(
            vec![
                Participant::new("g2", "Aardvark"),
                Participant::owner("own", "Zebra"),
                Participant::new("self", "Tiger"),
            ],
            "self".into(),
        );
        let ids: Vec<&str> = registry.sorted().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["self", "own", "g2"]);
    }

    #[test]
    fn test_sort_guests_alphabetical_with_insertion_tiebreak() {
        let mut registry = PresenceRegistry::new();
        registry.replace_all(
            vec![
                Participant::new("self", "Lion"),
                Participant::new("b1", "Tiger"),
                Participant::new("a1", "Hippo"),
                Participant::new("b2", "Tiger"),
            ],
            "self".into(),
        );
        let ids: Vec<&str> = registry.sorted().iter().map(|p| p.id.as_str()).collect();
        // Hippo before the Tigers; equal Tigers keep insertion order.
        assert_eq!(ids, ["self", "a1", "b1", "b2"]);
    }

    #[test]
    fn test_add_remove_roundtrip() {
        let mut registry = PresenceRegistry::new();
        registry.replace_all(vec![Participant::new("self", "Lion")], "self".into());
        registry.add(Participant::new("p2", "Tiger"));
        assert_eq!(registry.len(), 2);

        registry.update_cursor("p2", Some(4));
        assert_eq!(registry.get("p2").unwrap().cursor_position, Some(4));

        let removed = registry.remove("p2").unwrap();
        // Removal discards the cached cursor with the entry.
        assert_eq!(removed.name, "Tiger");
        assert!(registry.get("p2").is_none());
    }

    #[test]
    fn test_update_cursor_unknown_id() {
        let mut registry = PresenceRegistry::new();
        assert!(!registry.update_cursor("ghost", Some(1)));
    }

    #[test]
    fn test_remote_cursors_skip_self_and_unresolvable() {
        let surface = FixedGridSurface::new("Hello");
        let mut registry = PresenceRegistry::new();
        registry.replace_all(
            vec![
                Participant { cursor_position: Some(2), ..Participant::new("self", "Lion") },
                Participant { cursor_position: Some(4), ..Participant::new("p2", "Tiger") },
                // Stale offset past the current content: skipped this pass.
                Participant { cursor_position: Some(40), ..Participant::new("p3", "Hippo") },
                // No cursor reported yet: skipped.
                Participant::new("p4", "Zebra"),
            ],
            "self".into(),
        );

        let cursors = registry.remote_cursors(&surface);
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].id, "p2");
        assert_eq!(cursors[0].color.hex, "#3B82F6");
        assert_eq!(cursors[0].rect.x, 4.0 * 8.0 - 1.0);
    }
}
