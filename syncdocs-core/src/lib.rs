//! # syncdocs-core — document diffing and surface primitives for SyncDocs
//!
//! The dependency-free leaves of the collaboration engine:
//!
//! - [`delta`] — compute/apply a single contiguous replacement span
//!   between two versions of serialized document content
//! - [`surface`] — the injected rendering-surface capability and the
//!   offset→rectangle cursor projection used to draw remote carets
//!
//! Everything here is synchronous and side-effect free; the network-facing
//! session logic lives in `syncdocs-collab`.

pub mod delta;
pub mod surface;

pub use delta::{apply_delta, compute_delta, Delta};
pub use surface::{project_offset, CursorRect, FixedGridSurface, RenderSurface, TextRun};
