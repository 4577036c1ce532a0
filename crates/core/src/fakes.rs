//! In-memory scripted store used by the coordinator, detector and abort
//! handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::conflict::MergeConflicts;
use crate::errors::StoreError;
use crate::store::{MergeAttempt, MergeOptions, RowStore, StoreKind, TreeStore, VersionedStore};

#[derive(Debug)]
struct FakeState {
    branch: Option<String>,
    head: String,
    next_commit: u32,
    merging: bool,
    pending: MergeConflicts,
    conflicts_by_branch: HashMap<String, MergeConflicts>,
    fail_merge: Option<String>,
    fail_after_commit: Option<String>,
    fail_reset: Option<String>,
    fail_abort: Option<String>,
    merges: Vec<(String, MergeOptions)>,
    resets: Vec<String>,
}

/// A store whose merge results are scripted per source branch.
#[derive(Debug)]
pub(crate) struct FakeStore {
    kind: StoreKind,
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub(crate) fn new(kind: StoreKind) -> Self {
        let prefix = match kind {
            StoreKind::Row => "row",
            StoreKind::Tree => "tree",
        };
        Self {
            kind,
            state: Mutex::new(FakeState {
                branch: Some("main".into()),
                head: format!("{prefix}-0"),
                next_commit: 1,
                merging: false,
                pending: MergeConflicts::default(),
                conflicts_by_branch: HashMap::new(),
                fail_merge: None,
                fail_after_commit: None,
                fail_reset: None,
                fail_abort: None,
                merges: Vec::new(),
                resets: Vec::new(),
            }),
        }
    }

    pub(crate) fn row() -> Self {
        Self::new(StoreKind::Row)
    }

    pub(crate) fn tree() -> Self {
        Self::new(StoreKind::Tree)
    }

    /// Merging `branch` will stop on `conflicts`.
    pub(crate) fn conflicts_with(self, branch: &str, conflicts: MergeConflicts) -> Self {
        self.state
            .lock()
            .unwrap()
            .conflicts_by_branch
            .insert(branch.into(), conflicts);
        self
    }

    pub(crate) fn on_branch(self, branch: Option<&str>) -> Self {
        self.state.lock().unwrap().branch = branch.map(String::from);
        self
    }

    pub(crate) fn failing_merge(self, detail: &str) -> Self {
        self.state.lock().unwrap().fail_merge = Some(detail.into());
        self
    }

    /// Merges commit and then fail, like a read timing out after the engine
    /// already moved HEAD.
    pub(crate) fn failing_after_commit(self, detail: &str) -> Self {
        self.state.lock().unwrap().fail_after_commit = Some(detail.into());
        self
    }

    pub(crate) fn failing_reset(self, detail: &str) -> Self {
        self.state.lock().unwrap().fail_reset = Some(detail.into());
        self
    }

    pub(crate) fn failing_abort(self, detail: &str) -> Self {
        self.state.lock().unwrap().fail_abort = Some(detail.into());
        self
    }

    pub(crate) fn head(&self) -> String {
        self.state.lock().unwrap().head.clone()
    }

    pub(crate) fn is_merging(&self) -> bool {
        self.state.lock().unwrap().merging
    }

    pub(crate) fn merge_calls(&self) -> Vec<(String, MergeOptions)> {
        self.state.lock().unwrap().merges.clone()
    }

    pub(crate) fn resets(&self) -> Vec<String> {
        self.state.lock().unwrap().resets.clone()
    }

    fn engine_error(&self, detail: &str) -> StoreError {
        StoreError::InvalidState {
            store: self.kind,
            detail: detail.into(),
        }
    }
}

impl VersionedStore for FakeStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn current_branch(&self) -> Result<String, StoreError> {
        self.state
            .lock()
            .unwrap()
            .branch
            .clone()
            .ok_or(StoreError::Detached { store: self.kind })
    }

    async fn commit_hash(&self) -> Result<String, StoreError> {
        Ok(self.head())
    }

    async fn attempt_merge(
        &self,
        source: &str,
        options: &MergeOptions,
    ) -> Result<MergeAttempt, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.merges.push((source.to_string(), options.clone()));
        if let Some(detail) = state.fail_merge.clone() {
            return Err(self.engine_error(&detail));
        }
        if let Some(conflicts) = state.conflicts_by_branch.get(source).cloned() {
            state.merging = true;
            state.pending = conflicts.clone();
            return Ok(MergeAttempt::Conflicted(conflicts));
        }
        if options.no_commit {
            state.merging = true;
            return Ok(MergeAttempt::Merged(state.head.clone()));
        }
        let prefix = match self.kind {
            StoreKind::Row => "row",
            StoreKind::Tree => "tree",
        };
        state.head = format!("{prefix}-{}", state.next_commit);
        state.next_commit += 1;
        if let Some(detail) = state.fail_after_commit.clone() {
            return Err(StoreError::Timeout {
                store: self.kind,
                operation: detail,
                timeout_secs: 5,
            });
        }
        Ok(MergeAttempt::Merged(state.head.clone()))
    }

    async fn list_conflicts(&self) -> Result<MergeConflicts, StoreError> {
        Ok(self.state.lock().unwrap().pending.clone())
    }

    async fn abort_merge(&self) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = state.fail_abort.clone() {
            return Err(self.engine_error(&detail));
        }
        if !state.merging {
            return Ok(false);
        }
        state.merging = false;
        state.pending = MergeConflicts::default();
        Ok(true)
    }

    async fn merge_in_progress(&self) -> Result<bool, StoreError> {
        Ok(self.is_merging())
    }

    async fn preview_merge(
        &self,
        source: &str,
        _target: &str,
    ) -> Result<MergeConflicts, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .conflicts_by_branch
            .get(source)
            .cloned()
            .unwrap_or_default())
    }
}

impl RowStore for FakeStore {
    async fn reset_to(&self, commit: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.resets.push(commit.to_string());
        if let Some(detail) = state.fail_reset.clone() {
            return Err(self.engine_error(&detail));
        }
        state.head = commit.to_string();
        state.merging = false;
        state.pending = MergeConflicts::default();
        Ok(())
    }
}

impl TreeStore for FakeStore {}
