//! Conflict model and dry-run detection.
//!
//! The conflict subsystem is responsible for:
//! 1. **Modelling** -- row-level and file-level conflict values shared by both stores.
//! 2. **Detection** -- previewing a merge in both stores without mutating either.

pub mod detector;
pub mod model;

pub use detector::ConflictDetector;
pub use model::{resolution_hint, MergeConflicts, RowConflict};
