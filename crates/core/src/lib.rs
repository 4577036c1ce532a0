//! Lockstep core library.
//!
//! Keeps a structured row store (Dolt) and a file-tree store (Git) merging
//! together: adapters for both engines, dry-run conflict detection, the
//! merge coordinator with row-store rollback, abort handling, the project
//! lock, configuration, and the JSON report envelopes.

pub mod config;
pub mod conflict;
pub mod dolt;
pub mod errors;
pub mod git;
pub mod lock;
pub mod merge;
pub mod report;
pub mod store;

#[cfg(test)]
mod fakes;

// Re-exports for convenience.
pub use config::ProjectConfig;
pub use conflict::{ConflictDetector, MergeConflicts, RowConflict};
pub use dolt::DoltStore;
pub use git::GitStore;
pub use merge::{AbortHandler, MergeCoordinator, MergeFailure, MergeOutcome};
pub use store::{MergeAttempt, MergeOptions, RowStore, StoreKind, Timeouts, TreeStore, VersionedStore};
