//! Greedy single-span diffing between two versions of document content.
//!
//! The algorithm finds the longest common prefix and suffix of the two
//! strings and replaces everything in between as one contiguous span:
//!
//! ```text
//! previous:  <p>Hello world</p>
//! next:      <p>Hello brave world</p>
//!                      └──────┘
//!            start = 9, end = 9, content = "brave "
//! ```
//!
//! This is deliberately not edit-distance minimal. If an edit reintroduces
//! a character identical to one further away, the span is larger than
//! necessary — but applying the delta always reconstructs `next` exactly,
//! provided the base string is the same `previous` it was computed against.
//! Nothing here validates the base; a drifted base silently produces
//! corrupted output. Version checking happens a layer up, in the room
//! protocol.
//!
//! Offsets count characters, not bytes, so they line up with the caret
//! offsets reported by the rendering surface.

use serde::{Deserialize, Serialize};

/// A contiguous replace-range edit: replace `[start, end)` of the prior
/// string with `content`.
///
/// Invariant (for deltas produced by [`compute_delta`]):
/// `0 <= start <= end <= previous.chars().count()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub start: usize,
    pub end: usize,
    pub content: String,
}

impl Delta {
    /// Whether this delta leaves the document unchanged.
    pub fn is_noop(&self) -> bool {
        self.start == self.end && self.content.is_empty()
    }
}

/// Compute the single contiguous span that turns `previous` into `next`.
///
/// Scans forward while characters match, then backward from both ends,
/// never letting the suffix scan cross the prefix boundary already found.
/// For identical inputs the result is the no-op delta
/// `{ start: len, end: len, content: "" }`.
pub fn compute_delta(previous: &str, next: &str) -> Delta {
    let prev: Vec<char> = previous.chars().collect();
    let new: Vec<char> = next.chars().collect();

    let mut start = 0;
    while start < prev.len() && start < new.len() && prev[start] == new[start] {
        start += 1;
    }

    let mut prev_end = prev.len();
    let mut new_end = new.len();
    // Stop at `start` so the suffix never overlaps the prefix.
    while prev_end > start && new_end > start && prev[prev_end - 1] == new[new_end - 1] {
        prev_end -= 1;
        new_end -= 1;
    }

    Delta {
        start,
        end: prev_end,
        content: new[start..new_end].iter().collect(),
    }
}

/// Apply a delta to a base string.
///
/// Pure: returns `current[..start] + content + current[end..]` (in
/// character offsets). Exact reconstruction holds only when `current`
/// is identical to the `previous` the delta was computed against.
pub fn apply_delta(current: &str, delta: &Delta) -> String {
    let mut out = String::with_capacity(current.len() + delta.content.len());
    out.extend(current.chars().take(delta.start));
    out.push_str(&delta.content);
    out.extend(current.chars().skip(delta.end));
    out
}
