//! Per-invocation merge session and its state machine.
//!
//! A session lives for exactly one `merge_branch` call. It holds the
//! pre-merge commits needed for compensation and is dropped at the end of
//! the call; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::failure::MergeFailure;

/// States of a dual-store merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Start,
    RowMerged,
    TreeMerged,
    RolledBack,
    RollbackFailed,
}

impl MergeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TreeMerged | Self::RolledBack | Self::RollbackFailed)
    }

    fn can_advance_to(self, next: MergeState) -> bool {
        matches!(
            (self, next),
            (Self::Start, Self::RowMerged)
                | (Self::Start, Self::RolledBack)
                | (Self::Start, Self::RollbackFailed)
                | (Self::RowMerged, Self::TreeMerged)
                | (Self::RowMerged, Self::RolledBack)
                | (Self::RowMerged, Self::RollbackFailed)
        )
    }
}

impl std::fmt::Display for MergeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::RowMerged => write!(f, "row_merged"),
            Self::TreeMerged => write!(f, "tree_merged"),
            Self::RolledBack => write!(f, "rolled_back"),
            Self::RollbackFailed => write!(f, "rollback_failed"),
        }
    }
}

/// State captured before any mutation, used solely to drive rollback.
#[derive(Debug, Clone)]
pub struct MergeSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub source_branch: String,
    pub target_branch: String,
    pub pre_merge_row_commit: String,
    pub pre_merge_tree_commit: String,
    state: MergeState,
}

impl MergeSession {
    pub fn new(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        pre_merge_row_commit: impl Into<String>,
        pre_merge_tree_commit: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            pre_merge_row_commit: pre_merge_row_commit.into(),
            pre_merge_tree_commit: pre_merge_tree_commit.into(),
            state: MergeState::Start,
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Move to `next`, rejecting transitions the state machine does not
    /// allow.
    pub fn advance(&mut self, next: MergeState) -> Result<(), MergeFailure> {
        if !self.state.can_advance_to(next) {
            return Err(MergeFailure::operation(format!(
                "invalid merge state transition from {} to {}",
                self.state, next
            )));
        }
        debug!(session = %self.id, from = %self.state, to = %next, "merge state transition");
        self.state = next;
        if next.is_terminal() {
            let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
            info!(session = %self.id, state = %next, elapsed_ms, "merge session finished");
        }
        Ok(())
    }
}
