//! JSON envelopes printed by `--json`.
//!
//! Every envelope carries a top-level `success` flag so callers can branch
//! before looking at anything else.

use serde::Serialize;

use crate::conflict::MergeConflicts;
use crate::merge::{MergeErrorCode, MergeFailure, MergeOutcome};
use crate::store::StoreStatus;

/// Envelope for a merge that committed (or staged) in both stores.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuccessReport {
    pub success: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub row_commit_hash: String,
    pub tree_commit_hash: String,
    pub message: String,
}

impl From<&MergeOutcome> for SuccessReport {
    fn from(outcome: &MergeOutcome) -> Self {
        Self {
            success: true,
            source_branch: outcome.source_branch.clone(),
            target_branch: outcome.target_branch.clone(),
            row_commit_hash: outcome.row_commit_hash.clone(),
            tree_commit_hash: outcome.tree_commit_hash.clone(),
            message: outcome.message.clone(),
        }
    }
}

/// Envelope for any [`MergeFailure`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailureReport {
    pub success: bool,
    pub error_code: MergeErrorCode,
    pub message: String,
    /// Empty for failures that carry no conflicts.
    pub conflicts: MergeConflicts,
    /// Only set for `ROLLBACK_FAILED`: the commit to reset the row store to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_merge_row_commit: Option<String>,
}

impl From<&MergeFailure> for FailureReport {
    fn from(failure: &MergeFailure) -> Self {
        let pre_merge_row_commit = match failure {
            MergeFailure::RollbackFailed {
                pre_merge_row_commit,
                ..
            } => Some(pre_merge_row_commit.clone()),
            _ => None,
        };
        Self {
            success: false,
            error_code: failure.error_code(),
            message: failure.to_string(),
            conflicts: failure.conflicts().cloned().unwrap_or_default(),
            pre_merge_row_commit,
        }
    }
}

/// Envelope for `merge --dry-run`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DryRunReport {
    /// `true` when no conflicts are predicted.
    pub success: bool,
    pub dry_run: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub conflicts: MergeConflicts,
}

impl DryRunReport {
    pub fn new(source: &str, target: &str, conflicts: MergeConflicts) -> Self {
        Self {
            success: conflicts.is_empty(),
            dry_run: true,
            source_branch: source.to_string(),
            target_branch: target.to_string(),
            conflicts,
        }
    }

    /// `0` clean, `1` if any row conflict is predicted, `2` for tree-only
    /// conflicts. Mirrors the codes a real merge would exit with.
    pub fn exit_code(&self) -> u8 {
        if self.conflicts.is_empty() {
            0
        } else if self.conflicts.has_row_conflicts() {
            1
        } else {
            2
        }
    }
}

/// Envelope for `merge --abort`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AbortReport {
    pub success: bool,
    pub aborted: bool,
    pub message: String,
}

impl AbortReport {
    pub fn new(aborted: bool) -> Self {
        let message = if aborted {
            "Merge aborted; both stores restored to their pre-merge state".to_string()
        } else {
            "No merge in progress".to_string()
        };
        Self {
            success: true,
            aborted,
            message,
        }
    }
}

/// Envelope for `status`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    pub success: bool,
    pub row_store: StoreStatus,
    pub tree_store: StoreStatus,
    /// Both stores are on the same branch.
    pub aligned: bool,
}

impl StatusReport {
    pub fn new([row_store, tree_store]: [StoreStatus; 2]) -> Self {
        let aligned = row_store.branch == tree_store.branch;
        Self {
            success: true,
            row_store,
            tree_store,
            aligned,
        }
    }
}

/// Pretty-printed JSON for any envelope.
pub fn to_json<T: Serialize>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
