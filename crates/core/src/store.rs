//! Adapter contracts for the two version-controlled stores.
//!
//! The coordinator never talks to an engine directly. Everything it needs
//! from the row store (Dolt) and the tree store (Git) goes through
//! [`VersionedStore`], [`RowStore`] and [`TreeStore`], which is also the
//! seam the tests use to substitute in-memory fakes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conflict::MergeConflicts;
use crate::errors::StoreError;

/// Which of the two stores an adapter fronts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Structured, table-oriented store.
    Row,
    /// File-tree store.
    Tree,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Row => write!(f, "row"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// Caller-controlled merge options. Forwarded verbatim to the tree store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Perform the merge but leave the commit pending.
    pub no_commit: bool,
    /// Collapse the source branch into a single-parent commit.
    pub squash: bool,
    /// Custom merge commit message.
    pub message: Option<String>,
}

/// Non-error result of [`VersionedStore::attempt_merge`].
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAttempt {
    /// The merge completed; carries the resulting HEAD hash.
    Merged(String),
    /// The merge stopped on conflicts. The store is left
    /// conflicted-but-not-committed.
    Conflicted(MergeConflicts),
}

/// Per-call time budgets for engine invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Metadata reads (branch, HEAD, conflict listing).
    pub metadata: Duration,
    /// Merges, resets, aborts and previews.
    pub merge: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            metadata: Duration::from_secs(5),
            merge: Duration::from_secs(60),
        }
    }
}

/// Read-only snapshot of one store, used by the status report and by the
/// dry-run postcondition check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStatus {
    pub store: StoreKind,
    pub branch: String,
    pub commit_hash: String,
    pub merge_in_progress: bool,
}

/// Operations shared by both store adapters.
#[allow(async_fn_in_trait)]
pub trait VersionedStore {
    /// Which store this adapter fronts.
    fn kind(&self) -> StoreKind;

    /// Name of the checked-out branch. Fails with
    /// [`StoreError::Detached`] when the working copy is not on a branch.
    async fn current_branch(&self) -> Result<String, StoreError>;

    /// Identifier of the current HEAD commit.
    async fn commit_hash(&self) -> Result<String, StoreError>;

    /// Merge `source` into the checked-out branch.
    async fn attempt_merge(
        &self,
        source: &str,
        options: &MergeOptions,
    ) -> Result<MergeAttempt, StoreError>;

    /// Conflicts in the current working state.
    async fn list_conflicts(&self) -> Result<MergeConflicts, StoreError>;

    /// Revert an in-progress merge. Returns `false` when there was nothing
    /// to abort.
    async fn abort_merge(&self) -> Result<bool, StoreError>;

    /// Whether a merge is currently in progress (merge state or conflict
    /// markers present).
    async fn merge_in_progress(&self) -> Result<bool, StoreError>;

    /// Report the conflicts merging `source` into `target` would produce.
    /// Must leave commit hashes and conflict markers exactly as found.
    async fn preview_merge(&self, source: &str, target: &str)
        -> Result<MergeConflicts, StoreError>;

    /// Snapshot of branch, HEAD and merge state.
    async fn status(&self) -> Result<StoreStatus, StoreError> {
        Ok(StoreStatus {
            store: self.kind(),
            branch: self.current_branch().await?,
            commit_hash: self.commit_hash().await?,
            merge_in_progress: self.merge_in_progress().await?,
        })
    }
}

/// The structured row store. The only store the coordinator ever resets.
#[allow(async_fn_in_trait)]
pub trait RowStore: VersionedStore {
    /// Hard-reset to a previously captured commit.
    async fn reset_to(&self, commit: &str) -> Result<(), StoreError>;
}

/// The file-tree store.
pub trait TreeStore: VersionedStore {}
