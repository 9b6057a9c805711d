//! Rendering-surface capability and cursor projection.
//!
//! The editing surface (a contentEditable-like widget, a terminal grid, a
//! GPU text view) is external to the sync engine. The engine only ever
//! touches it through the [`RenderSurface`] trait, injected by reference —
//! never reached ambiently — which keeps every consumer testable against
//! a fake surface.
//!
//! [`project_offset`] is the one non-trivial algorithm here: it walks the
//! surface's text runs in document order to translate an abstract character
//! offset into a pixel rectangle for drawing a remote participant's caret.
//! Offsets arrive asynchronously over the network, so a stale offset
//! against content that has since shrunk is an expected, recoverable
//! condition: the projection returns `None` and the caller simply skips
//! that cursor for the current render pass.

use serde::{Deserialize, Serialize};

use crate::delta::{apply_delta, Delta};

/// A pixel rectangle anchoring a caret on screen. Ephemeral: recomputed
/// every render cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorRect {
    pub x: f32,
    pub y: f32,
    pub height: f32,
}

/// One run of text in document order, as exposed by the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Run length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The capability the sync engine requires from an editing surface.
///
/// The surface owns the document buffer — the single source of truth for
/// "has anything changed". The engine reads and writes it only through
/// these entry points (tick sampling, wholesale replacement on snapshot,
/// range replacement on remote deltas).
pub trait RenderSurface {
    /// Current serialized content of the buffer.
    fn content(&self) -> String;

    /// Replace the buffer wholesale (snapshot application).
    fn set_content(&mut self, content: &str);

    /// Apply a character-range replacement to the buffer.
    fn replace_range(&mut self, start: usize, end: usize, content: &str);

    /// Current caret offset in characters, or `None` when the selection
    /// is outside the editable surface.
    fn caret_offset(&self) -> Option<usize>;

    /// Text runs of the rendered content, in document order.
    fn text_runs(&self) -> Vec<TextRun>;

    /// Measure the pixel rectangle at a character position inside a run.
    /// `None` when the surface cannot produce a measurable rectangle.
    fn measure(&self, run_index: usize, local_offset: usize) -> Option<CursorRect>;
}

/// Map a character offset to a pixel rectangle against a live surface.
///
/// Walks the runs accumulating consumed characters until the running total
/// would reach `offset`; the offset then falls inside the current run at a
/// local sub-offset. Edge cases:
///
/// - offset `0` resolves to the start of the first run
/// - offset equal to the total length resolves to the end of the last run
/// - offset past the total length returns `None` (a stale report racing a
///   remote delta), as does a surface with no runs or a failed measurement
///
/// Never panics.
pub fn project_offset<S: RenderSurface + ?Sized>(surface: &S, offset: usize) -> Option<CursorRect> {
    let runs = surface.text_runs();
    if runs.is_empty() {
        return None;
    }
    if offset == 0 {
        // Degenerate collapse at the very beginning, even into an empty run.
        return surface.measure(0, 0);
    }

    let mut consumed = 0usize;
    for (index, run) in runs.iter().enumerate() {
        let len = run.len();
        if consumed + len >= offset {
            let local = offset - consumed;
            if local > len {
                // Stale offset against content that has since shrunk.
                log::warn!("cursor offset {offset} lands outside run {index} (len {len})");
                return None;
            }
            return surface.measure(index, local);
        }
        consumed += len;
    }

    // Offset beyond the total rendered length: superseded content.
    None
}

/// Reference surface laying characters out on a fixed monospace grid.
///
/// One run per line (newlines counted with the line they end), carets
/// measured at `char_width` × `line_height` cells with a 1px left nudge
/// so the caret sits just before the glyph. Used by tests throughout the
/// workspace and suitable for headless demos.
#[derive(Debug, Clone)]
pub struct FixedGridSurface {
    content: String,
    caret: Option<usize>,
    pub char_width: f32,
    pub line_height: f32,
}

impl FixedGridSurface {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            caret: None,
            char_width: 8.0,
            line_height: 16.0,
        }
    }

    /// Move the local caret (or park it outside the surface with `None`).
    pub fn set_caret(&mut self, offset: Option<usize>) {
        self.caret = offset;
    }

    /// Type at the caret: insert text and advance.
    pub fn type_str(&mut self, text: &str) {
        let at = self.caret.unwrap_or_else(|| self.content.chars().count());
        self.replace_range(at, at, text);
        self.caret = Some(at + text.chars().count());
    }
}

impl RenderSurface for FixedGridSurface {
    fn content(&self) -> String {
        self.content.clone()
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
    }

    fn replace_range(&mut self, start: usize, end: usize, content: &str) {
        let delta = Delta { start, end, content: content.to_string() };
        self.content = apply_delta(&self.content, &delta);
    }

    fn caret_offset(&self) -> Option<usize> {
        self.caret
    }

    fn text_runs(&self) -> Vec<TextRun> {
        if self.content.is_empty() {
            return Vec::new();
        }
        self.content
            .split_inclusive('\n')
            .map(TextRun::new)
            .collect()
    }

    fn measure(&self, run_index: usize, local_offset: usize) -> Option<CursorRect> {
        let runs = self.text_runs();
        let run = runs.get(run_index)?;
        if local_offset > run.len() {
            return None;
        }
        Some(CursorRect {
            x: local_offset as f32 * self.char_width - 1.0,
            y: run_index as f32 * self.line_height,
            height: self.line_height,
        })
    }
}
