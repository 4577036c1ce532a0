//! Dual-store merge coordinator.
//!
//! The [`MergeCoordinator`] merges a branch into the current branch of both
//! stores, which share no transaction log. Atomicity is emulated by
//! ordering and compensation:
//!
//! 1. Capture the pre-merge HEAD of both stores.
//! 2. Merge the row store. A conflict stops here; the tree store is never
//!    touched.
//! 3. Merge the tree store with the caller's options.
//! 4. If the tree store did not merge, reset the row store to the captured
//!    commit so it never ends up ahead of the tree store.
//!
//! Every entry point takes the advisory [`MergeLock`] when a control
//! directory is configured.

use std::path::PathBuf;

use tracing::{error, info, instrument, warn};

use super::abort::AbortHandler;
use super::failure::{MergeFailure, MergeOutcome};
use super::session::{MergeSession, MergeState};
use crate::config::ProjectConfig;
use crate::conflict::{ConflictDetector, MergeConflicts};
use crate::dolt::DoltStore;
use crate::errors::{CoreError, StoreError};
use crate::git::GitStore;
use crate::lock::MergeLock;
use crate::store::{MergeAttempt, MergeOptions, RowStore, StoreStatus, TreeStore};

/// Prefix of every row-store merge commit message. Keeps the row-store log
/// distinguishable from the tree-store log.
pub const ROW_MERGE_MARKER: &str = "lockstep:";

/// Sequences and compensates merges across a row store and a tree store.
pub struct MergeCoordinator<R, T> {
    row_store: R,
    tree_store: T,
    lock_dir: Option<PathBuf>,
}

impl<R: RowStore, T: TreeStore> MergeCoordinator<R, T> {
    /// Create a coordinator over two already-configured adapters. No lock is
    /// taken until [`MergeCoordinator::with_lock_dir`] is set.
    pub fn new(row_store: R, tree_store: T) -> Self {
        Self {
            row_store,
            tree_store,
            lock_dir: None,
        }
    }

    /// Take the advisory lock in `dir` for every operation.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn row_store(&self) -> &R {
        &self.row_store
    }

    pub fn tree_store(&self) -> &T {
        &self.tree_store
    }

    fn acquire_lock(&self) -> Result<Option<MergeLock>, MergeFailure> {
        match &self.lock_dir {
            Some(dir) => Ok(Some(MergeLock::acquire(dir)?)),
            None => Ok(None),
        }
    }

    /// Merge `source` into the current branch of both stores.
    #[instrument(skip(self, options), fields(no_commit = options.no_commit, squash = options.squash))]
    pub async fn merge_branch(
        &self,
        source: &str,
        options: &MergeOptions,
    ) -> Result<MergeOutcome, MergeFailure> {
        let _lock = self.acquire_lock()?;

        let target = self.aligned_target(source).await?;
        let pre_row = self.row_store.commit_hash().await?;
        let pre_tree = self.tree_store.commit_hash().await?;
        let mut session = MergeSession::new(source, &target, pre_row, pre_tree);
        info!(
            session = %session.id,
            source,
            target = %target,
            pre_merge_row_commit = %session.pre_merge_row_commit,
            pre_merge_tree_commit = %session.pre_merge_tree_commit,
            "starting dual-store merge"
        );

        // Row store first: cheap to detect and cheap to undo.
        let row_options = MergeOptions {
            message: Some(row_merge_message(source, &target)),
            ..MergeOptions::default()
        };
        let row_attempt = match self.row_store.attempt_merge(source, &row_options).await {
            Ok(attempt) => attempt,
            Err(err) => return Err(self.compensate_row_error(&mut session, err).await),
        };
        let row_commit = match row_attempt {
            MergeAttempt::Merged(hash) => hash,
            MergeAttempt::Conflicted(conflicts) => {
                warn!(
                    session = %session.id,
                    count = conflicts.row_conflicts.len(),
                    "row store merge conflicted; tree store left untouched"
                );
                return Err(MergeFailure::RowConflict(conflicts.with_hint()));
            }
        };
        session.advance(MergeState::RowMerged)?;
        info!(session = %session.id, row_commit = %row_commit, "row store merged");

        let tree_options = MergeOptions {
            message: Some(
                options
                    .message
                    .clone()
                    .unwrap_or_else(|| tree_merge_message(source, &target)),
            ),
            ..options.clone()
        };
        let tree_result = self.tree_store.attempt_merge(source, &tree_options).await;

        match tree_result {
            Ok(MergeAttempt::Merged(tree_commit)) => {
                session.advance(MergeState::TreeMerged)?;
                info!(session = %session.id, tree_commit = %tree_commit, "tree store merged");
                let message = if options.no_commit {
                    format!("Merged '{source}' into '{target}'; tree store commit pending")
                } else if options.squash {
                    format!("Squash-merged '{source}' into '{target}'")
                } else {
                    format!("Merged '{source}' into '{target}'")
                };
                Ok(MergeOutcome {
                    source_branch: source.to_string(),
                    target_branch: target,
                    row_commit_hash: row_commit,
                    tree_commit_hash: tree_commit,
                    message,
                })
            }
            Ok(MergeAttempt::Conflicted(conflicts)) => {
                warn!(
                    session = %session.id,
                    count = conflicts.tree_conflicts.len(),
                    "tree store merge conflicted; rolling back row store"
                );
                self.roll_back(&mut session).await?;
                Err(MergeFailure::TreeConflict(conflicts.with_hint()))
            }
            Err(err) => {
                warn!(session = %session.id, error = %err, "tree store merge failed; rolling back row store");
                self.roll_back(&mut session).await?;
                Err(MergeFailure::operation(format!(
                    "tree store merge failed after the row store merged (row store rolled back): {err}"
                )))
            }
        }
    }

    /// A row merge that errored may still have committed or left merge state
    /// behind (e.g. a follow-up read timed out). Put the row store back to
    /// the captured commit before reporting, unless it provably never moved.
    async fn compensate_row_error(&self, session: &mut MergeSession, err: StoreError) -> MergeFailure {
        let head = self.row_store.commit_hash().await;
        let merging = self.row_store.merge_in_progress().await;
        let untouched = matches!(
            (&head, &merging),
            (Ok(head), Ok(false)) if *head == session.pre_merge_row_commit
        );
        if untouched {
            warn!(session = %session.id, error = %err, "row store merge failed; nothing to undo");
            return MergeFailure::operation(format!("row store merge failed: {err}"));
        }

        warn!(
            session = %session.id,
            error = %err,
            head = ?head.ok(),
            "row store merge failed after changing the row store; rolling back"
        );
        match self.roll_back(session).await {
            Ok(()) => MergeFailure::operation(format!(
                "row store merge failed (row store rolled back): {err}"
            )),
            Err(failure) => failure,
        }
    }

    /// Reset the row store to its pre-merge commit. Returns
    /// [`MergeFailure::RollbackFailed`] when the reset itself fails.
    async fn roll_back(&self, session: &mut MergeSession) -> Result<(), MergeFailure> {
        let pre = session.pre_merge_row_commit.clone();
        match self.row_store.reset_to(&pre).await {
            Ok(()) => {
                session.advance(MergeState::RolledBack)?;
                info!(session = %session.id, commit = %pre, "row store rolled back");
                Ok(())
            }
            Err(err) => {
                session.advance(MergeState::RollbackFailed)?;
                error!(
                    session = %session.id,
                    pre_merge_row_commit = %pre,
                    error = %err,
                    "row store rollback failed; manual intervention required"
                );
                Err(MergeFailure::RollbackFailed {
                    detail: err.to_string(),
                    pre_merge_row_commit: pre,
                })
            }
        }
    }

    /// Both stores must sit on the same branch, and it must not be the
    /// source.
    async fn aligned_target(&self, source: &str) -> Result<String, MergeFailure> {
        let row_branch = self.row_store.current_branch().await?;
        let tree_branch = self.tree_store.current_branch().await?;
        if row_branch != tree_branch {
            return Err(MergeFailure::operation(format!(
                "stores are on different branches (row store: '{row_branch}', tree store: '{tree_branch}'); \
                 check out the same branch in both before merging"
            )));
        }
        if row_branch == source {
            return Err(MergeFailure::operation(format!(
                "cannot merge branch '{source}' into itself"
            )));
        }
        Ok(row_branch)
    }

    /// Dry run: report what merging `source` into `target` would conflict
    /// on, without changing either store.
    pub async fn check_conflicts(
        &self,
        source: &str,
        target: &str,
    ) -> Result<MergeConflicts, MergeFailure> {
        let _lock = self.acquire_lock()?;
        ConflictDetector::new(&self.row_store, &self.tree_store)
            .check_conflicts(source, target)
            .await
    }

    /// Dry run against the currently checked-out branch.
    pub async fn check_conflicts_with_current(
        &self,
        source: &str,
    ) -> Result<(String, MergeConflicts), MergeFailure> {
        let _lock = self.acquire_lock()?;
        let target = self.aligned_target(source).await?;
        let conflicts = ConflictDetector::new(&self.row_store, &self.tree_store)
            .check_conflicts(source, &target)
            .await?;
        Ok((target, conflicts))
    }

    /// Abort an in-progress merge in either store.
    pub async fn abort_merge(&self) -> Result<bool, MergeFailure> {
        let _lock = self.acquire_lock()?;
        AbortHandler::new(&self.row_store, &self.tree_store)
            .abort_merge()
            .await
    }

    /// Branch, HEAD and merge state of both stores.
    pub async fn status(&self) -> Result<[StoreStatus; 2], MergeFailure> {
        let _lock = self.acquire_lock()?;
        Ok([self.row_store.status().await?, self.tree_store.status().await?])
    }
}

impl MergeCoordinator<DoltStore, GitStore> {
    /// Open the Dolt and Git stores described by `config`, locking in its
    /// control directory.
    pub fn open(config: &ProjectConfig) -> Result<Self, CoreError> {
        let timeouts = config.timeouts();
        let rows = DoltStore::new(
            config.row_store_path(),
            config.row_store.binary.clone(),
            timeouts,
        )
        .map_err(StoreError::from)?;
        let tree = GitStore::new(config.tree_store_path(), timeouts).map_err(StoreError::from)?;
        info!(root = %config.root.display(), "project stores opened");
        Ok(Self::new(rows, tree).with_lock_dir(config.control_dir()))
    }
}

/// Row-store merge commit message. Never user controlled.
pub fn row_merge_message(source: &str, target: &str) -> String {
    format!("{ROW_MERGE_MARKER} merge '{source}' into '{target}' (row store)")
}

/// Default tree-store merge commit message.
pub fn tree_merge_message(source: &str, target: &str) -> String {
    format!("Merge branch '{source}' into {target}")
}
