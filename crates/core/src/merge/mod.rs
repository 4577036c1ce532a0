//! Dual-store merge: coordinator, abort handling, and the failure taxonomy.

pub mod abort;
pub mod coordinator;
pub mod failure;
pub mod session;

pub use abort::AbortHandler;
pub use coordinator::{row_merge_message, tree_merge_message, MergeCoordinator};
pub use failure::{MergeErrorCode, MergeFailure, MergeOutcome};
pub use session::{MergeSession, MergeState};
