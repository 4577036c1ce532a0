//! Merge outcome and the closed failure taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conflict::MergeConflicts;
use crate::errors::{ConfigError, CoreError, LockError, StoreError};

/// Result of a fully successful dual-store merge. Both hashes are always
/// present; a partial success never produces an outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeOutcome {
    pub source_branch: String,
    pub target_branch: String,
    pub row_commit_hash: String,
    pub tree_commit_hash: String,
    pub message: String,
}

/// Machine-readable failure code used in the JSON envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeErrorCode {
    RowConflict,
    TreeConflict,
    RollbackFailed,
    OperationFailed,
}

impl std::fmt::Display for MergeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowConflict => write!(f, "ROW_CONFLICT"),
            Self::TreeConflict => write!(f, "TREE_CONFLICT"),
            Self::RollbackFailed => write!(f, "ROLLBACK_FAILED"),
            Self::OperationFailed => write!(f, "OPERATION_FAILED"),
        }
    }
}

/// Every way a merge, dry run, or abort can fail.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MergeFailure {
    /// The row store reported conflicts. No commit moved in either store
    /// and the tree store was never touched.
    #[error("row store merge conflicts in {} row(s)", .0.row_conflicts.len())]
    RowConflict(MergeConflicts),

    /// The tree store reported conflicts after the row store merged. The row
    /// store has been reset to its pre-merge commit; the tree store is left
    /// conflicted for resolution with native tooling.
    #[error("tree store merge conflicts in {} file(s); row store rolled back", .0.tree_conflicts.len())]
    TreeConflict(MergeConflicts),

    /// Compensation failed; the stores may disagree.
    #[error(
        "rollback failed: {detail}. Manual intervention required: reset the row store to {pre_merge_row_commit}"
    )]
    RollbackFailed {
        detail: String,
        pre_merge_row_commit: String,
    },

    /// Transport, engine, lock, or configuration error.
    #[error("{detail}")]
    Operation { detail: String },
}

impl MergeFailure {
    pub fn operation(detail: impl Into<String>) -> Self {
        Self::Operation {
            detail: detail.into(),
        }
    }

    pub fn error_code(&self) -> MergeErrorCode {
        match self {
            Self::RowConflict(_) => MergeErrorCode::RowConflict,
            Self::TreeConflict(_) => MergeErrorCode::TreeConflict,
            Self::RollbackFailed { .. } => MergeErrorCode::RollbackFailed,
            Self::Operation { .. } => MergeErrorCode::OperationFailed,
        }
    }

    /// Process exit code for this failure: `1` row conflicts, `2` tree
    /// conflicts, `3` rollback failed, `4` operation failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::RowConflict(_) => 1,
            Self::TreeConflict(_) => 2,
            Self::RollbackFailed { .. } => 3,
            Self::Operation { .. } => 4,
        }
    }

    /// Conflicts carried by the failure, if any.
    pub fn conflicts(&self) -> Option<&MergeConflicts> {
        match self {
            Self::RowConflict(c) | Self::TreeConflict(c) => Some(c),
            _ => None,
        }
    }

    /// Whether re-running the command after operator action can succeed
    /// without a manual reset.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::RollbackFailed { .. })
    }
}

impl From<StoreError> for MergeFailure {
    fn from(err: StoreError) -> Self {
        Self::operation(err.to_string())
    }
}

impl From<LockError> for MergeFailure {
    fn from(err: LockError) -> Self {
        Self::operation(err.to_string())
    }
}

impl From<ConfigError> for MergeFailure {
    fn from(err: ConfigError) -> Self {
        Self::operation(err.to_string())
    }
}

impl From<CoreError> for MergeFailure {
    fn from(err: CoreError) -> Self {
        Self::operation(err.to_string())
    }
}
