//! Tree-store adapter over a local Git repository via `git2`.
//!
//! `git2` calls are blocking, so each operation opens the repository on a
//! blocking task and is bounded by the configured timeout. A blocking task
//! cannot be killed: reads are simply abandoned when they overrun, while
//! writes are told to stop at their next checkpoint and are always awaited,
//! so the caller never reports a failure for a merge that later lands.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use git2::build::CheckoutBuilder;
use git2::{BranchType, Commit, Index, Repository, RepositoryState, ResetType, Signature};
use tracing::{debug, info, instrument, warn};

use crate::conflict::MergeConflicts;
use crate::errors::{GitError, StoreError};
use crate::store::{MergeAttempt, MergeOptions, StoreKind, Timeouts, TreeStore, VersionedStore};

/// Fallback identity when the repository has no `user.name`/`user.email`.
const FALLBACK_NAME: &str = "lockstep";
const FALLBACK_EMAIL: &str = "lockstep@localhost";

/// Cancellation flag shared with a blocking write once its time is up.
#[derive(Debug, Clone, Default)]
struct Deadline(Arc<AtomicBool>);

impl Deadline {
    fn expire(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn expired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tree store backed by a non-bare Git repository.
#[derive(Debug, Clone)]
pub struct GitStore {
    repo_path: PathBuf,
    timeouts: Timeouts,
}

impl GitStore {
    /// Open the Git repository containing `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P, timeouts: Timeouts) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::RepositoryNotFound(format!("{} (bare)", path.display())))?;
        Ok(Self {
            repo_path: workdir,
            timeouts,
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run `f` against a freshly opened repository on a blocking task.
    async fn with_repo<T, F>(
        &self,
        operation: &'static str,
        timeout: Duration,
        f: F,
    ) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T, GitError> + Send + 'static,
    {
        let path = self.repo_path.clone();
        let task = tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&path)
                .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
            f(&repo)
        });

        match tokio::time::timeout(timeout, task).await {
            Err(_) => {
                warn!(operation, timeout_secs = timeout.as_secs(), "git operation timed out");
                Err(StoreError::Timeout {
                    store: StoreKind::Tree,
                    operation: operation.to_string(),
                    timeout_secs: timeout.as_secs(),
                })
            }
            Ok(Err(join_err)) => Err(task_failed(join_err)),
            Ok(Ok(result)) => result.map_err(into_store_error),
        }
    }

    /// Like [`Self::with_repo`], for operations that change the repository.
    ///
    /// On timeout the deadline is expired and the task is still awaited:
    /// `f` either stops at a checkpoint with nothing left behind (reported as
    /// a timeout) or finishes, in which case its real result is returned.
    async fn with_repo_mut<T, F>(
        &self,
        operation: &'static str,
        timeout: Duration,
        f: F,
    ) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Repository, &Deadline) -> Result<T, GitError> + Send + 'static,
    {
        let path = self.repo_path.clone();
        let deadline = Deadline::default();
        let flag = deadline.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&path)
                .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
            f(&repo, &flag)
        });

        let joined = match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                deadline.expire();
                warn!(
                    operation,
                    timeout_secs = timeout.as_secs(),
                    "git operation overran its timeout, waiting for it to stop"
                );
                task.await
            }
        };

        match joined {
            Err(join_err) => Err(task_failed(join_err)),
            Ok(Err(GitError::DeadlineExceeded)) => Err(StoreError::Timeout {
                store: StoreKind::Tree,
                operation: operation.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
            Ok(result) => {
                if deadline.expired() {
                    info!(operation, "git operation finished after its timeout");
                }
                result.map_err(into_store_error)
            }
        }
    }
}

fn task_failed(err: tokio::task::JoinError) -> StoreError {
    StoreError::TaskFailed {
        store: StoreKind::Tree,
        detail: err.to_string(),
    }
}

fn into_store_error(err: GitError) -> StoreError {
    match err {
        GitError::Detached => StoreError::Detached {
            store: StoreKind::Tree,
        },
        other => other.into(),
    }
}

impl VersionedStore for GitStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Tree
    }

    async fn current_branch(&self) -> Result<String, StoreError> {
        self.with_repo("current branch", self.timeouts.metadata, head_branch)
            .await
    }

    async fn commit_hash(&self) -> Result<String, StoreError> {
        self.with_repo("commit hash", self.timeouts.metadata, head_sha)
            .await
    }

    #[instrument(skip(self, options), fields(path = %self.repo_path.display()))]
    async fn attempt_merge(
        &self,
        source: &str,
        options: &MergeOptions,
    ) -> Result<MergeAttempt, StoreError> {
        let source = source.to_string();
        let options = options.clone();
        self.with_repo_mut("merge", self.timeouts.merge, move |repo, deadline| {
            merge_branch(repo, &source, &options, deadline)
        })
        .await
    }

    async fn list_conflicts(&self) -> Result<MergeConflicts, StoreError> {
        self.with_repo("list conflicts", self.timeouts.metadata, |repo| {
            Ok(MergeConflicts::paths(conflict_paths(&repo.index()?)?))
        })
        .await
    }

    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn abort_merge(&self) -> Result<bool, StoreError> {
        self.with_repo_mut("merge --abort", self.timeouts.merge, |repo, _| {
            abort_in_progress(repo)
        })
        .await
    }

    async fn merge_in_progress(&self) -> Result<bool, StoreError> {
        self.with_repo("merge status", self.timeouts.metadata, in_progress)
            .await
    }

    /// In-memory merge of the two commits; no ref, index, or working-tree
    /// change.
    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn preview_merge(&self, source: &str, target: &str) -> Result<MergeConflicts, StoreError> {
        let (source, target) = (source.to_string(), target.to_string());
        self.with_repo("preview merge", self.timeouts.merge, move |repo| {
            let ours = resolve_commit(repo, &target)?;
            let theirs = resolve_commit(repo, &source)?;
            let index = repo.merge_commits(&ours, &theirs, None)?;
            let paths = conflict_paths(&index)?;
            debug!(count = paths.len(), "git preview complete");
            Ok(MergeConflicts::paths(paths))
        })
        .await
    }
}

impl TreeStore for GitStore {}

// ---------------------------------------------------------------------------
// Blocking helpers
// ---------------------------------------------------------------------------

fn head_branch(repo: &Repository) -> Result<String, GitError> {
    if repo.head_detached()? {
        return Err(GitError::Detached);
    }
    let head = repo.head()?;
    if !head.is_branch() {
        return Err(GitError::Detached);
    }
    head.shorthand().map(String::from).ok_or(GitError::Detached)
}

fn head_sha(repo: &Repository) -> Result<String, GitError> {
    Ok(repo.head()?.peel_to_commit()?.id().to_string())
}

/// Resolve a local branch name, falling back to any revspec.
fn resolve_commit<'r>(repo: &'r Repository, name: &str) -> Result<Commit<'r>, GitError> {
    if let Ok(branch) = repo.find_branch(name, BranchType::Local) {
        return Ok(branch.get().peel_to_commit()?);
    }
    repo.revparse_single(name)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|_| GitError::RefNotFound(name.to_string()))
}

/// Sorted, deduplicated paths of conflicted index entries.
fn conflict_paths(index: &Index) -> Result<Vec<String>, GitError> {
    let mut paths = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths.into_iter().collect())
}

fn in_progress(repo: &Repository) -> Result<bool, GitError> {
    Ok(repo.state() != RepositoryState::Clean || repo.index()?.has_conflicts())
}

fn signature(repo: &Repository) -> Result<Signature<'static>, GitError> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?),
    }
}

/// Merge `source` into the checked-out branch.
///
/// `deadline` is checked before the working tree is touched and again before
/// the merge is committed; an expired deadline at either point leaves the
/// repository as it was found.
fn merge_branch(
    repo: &Repository,
    source: &str,
    options: &MergeOptions,
    deadline: &Deadline,
) -> Result<MergeAttempt, GitError> {
    let target = head_branch(repo)?;
    let head_ref = repo.head()?;
    let head_name = head_ref.name().map(String::from).ok_or(GitError::Detached)?;
    let head_commit = head_ref.peel_to_commit()?;

    let source_commit = resolve_commit(repo, source)?;
    let annotated = repo.find_annotated_commit(source_commit.id())?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        info!(source, target = %target, "already up to date");
        return Ok(MergeAttempt::Merged(head_commit.id().to_string()));
    }

    if deadline.expired() {
        return Err(GitError::DeadlineExceeded);
    }

    if analysis.is_fast_forward() && !options.no_commit && !options.squash {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(source_commit.as_object(), Some(&mut checkout))?;
        repo.find_reference(&head_name)?.set_target(
            source_commit.id(),
            &format!("lockstep: fast-forward {target} to {source}"),
        )?;
        info!(source, target = %target, sha = %source_commit.id(), "fast-forwarded");
        return Ok(MergeAttempt::Merged(source_commit.id().to_string()));
    }

    let mut checkout = CheckoutBuilder::new();
    checkout.safe().allow_conflicts(true).conflict_style_merge(true);
    repo.merge(&[&annotated], None, Some(&mut checkout))?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        // Native merge state (MERGE_HEAD, conflicted index, markers in the
        // working tree) is left in place for the operator.
        let paths = conflict_paths(&index)?;
        info!(source, target = %target, count = paths.len(), "git merge stopped on conflicts");
        return Ok(MergeAttempt::Conflicted(MergeConflicts::paths(paths)));
    }

    if deadline.expired() {
        abort_in_progress(repo)?;
        warn!(source, target = %target, "git merge undone after its deadline");
        return Err(GitError::DeadlineExceeded);
    }

    if options.no_commit {
        if options.squash {
            repo.cleanup_state()?;
        }
        info!(source, target = %target, "git merge staged, commit pending");
        return Ok(MergeAttempt::Merged(head_commit.id().to_string()));
    }

    let tree_oid = index.write_tree()?;
    index.write()?;
    let tree = repo.find_tree(tree_oid)?;
    let sig = signature(repo)?;
    let message = options
        .message
        .clone()
        .unwrap_or_else(|| format!("Merge branch '{source}' into {target}"));
    let parents: Vec<&Commit> = if options.squash {
        vec![&head_commit]
    } else {
        vec![&head_commit, &source_commit]
    };
    let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
    repo.cleanup_state()?;
    info!(source, target = %target, sha = %oid, squash = options.squash, "git merge committed");
    Ok(MergeAttempt::Merged(oid.to_string()))
}

/// Hard-reset to HEAD and clear merge state, if a merge is in progress.
fn abort_in_progress(repo: &Repository) -> Result<bool, GitError> {
    if !in_progress(repo)? {
        debug!("no git merge in progress");
        return Ok(false);
    }
    let head = repo.head()?.peel_to_commit()?;
    repo.reset(head.as_object(), ResetType::Hard, None)?;
    repo.cleanup_state()?;
    info!(sha = %head.id(), "git merge aborted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, RepositoryInitOptions};

    fn init_repo(dir: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir, &opts).unwrap();
        commit_file(&repo, "README.md", "hello\n", "initial commit");
        repo
    }

    fn commit_file(repo: &Repository, path: &str, content: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        let full = workdir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn checkout(repo: &Repository, branch: &str) {
        repo.set_head(&format!("refs/heads/{branch}")).unwrap();
        repo.checkout_head(Some(CheckoutBuilder::new().force())).unwrap();
    }

    fn branch_from_head(repo: &Repository, name: &str) {
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(name, &head, false).unwrap();
    }

    fn store(dir: &Path) -> GitStore {
        GitStore::new(dir, Timeouts::default()).unwrap()
    }

    /// main and feature both edit README.md.
    fn conflicting_branches(repo: &Repository) {
        branch_from_head(repo, "feature");
        commit_file(repo, "README.md", "hello from main\n", "main edit");
        checkout(repo, "feature");
        commit_file(repo, "README.md", "hello from feature\n", "feature edit");
        checkout(repo, "main");
    }

    #[tokio::test]
    async fn test_branch_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let store = store(dir.path());
        assert_eq!(store.current_branch().await.unwrap(), "main");
        assert_eq!(
            store.commit_hash().await.unwrap(),
            repo.head().unwrap().peel_to_commit().unwrap().id().to_string()
        );
        assert!(!store.merge_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_detached_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let head = repo.head().unwrap().peel_to_commit().unwrap().id();
        repo.set_head_detached(head).unwrap();
        let err = store(dir.path()).current_branch().await.unwrap_err();
        assert!(matches!(err, StoreError::Detached { store: StoreKind::Tree }));
    }

    #[tokio::test]
    async fn test_clean_merge_commits_with_two_parents() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        branch_from_head(&repo, "feature");
        commit_file(&repo, "docs/main.md", "main\n", "main doc");
        checkout(&repo, "feature");
        commit_file(&repo, "docs/feature.md", "feature\n", "feature doc");
        checkout(&repo, "main");

        let store = store(dir.path());
        let before = store.commit_hash().await.unwrap();
        let attempt = store
            .attempt_merge("feature", &MergeOptions::default())
            .await
            .unwrap();
        let MergeAttempt::Merged(sha) = attempt else {
            panic!("expected clean merge, got {attempt:?}");
        };
        assert_ne!(sha, before);
        assert_eq!(store.commit_hash().await.unwrap(), sha);

        let commit = repo.find_commit(Oid::from_str(&sha).unwrap()).unwrap();
        assert_eq!(commit.parent_count(), 2);
        assert_eq!(commit.message(), Some("Merge branch 'feature' into main"));
        assert!(dir.path().join("docs/feature.md").exists());
        assert!(!store.merge_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_fast_forward() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        branch_from_head(&repo, "feature");
        checkout(&repo, "feature");
        let feature_sha = commit_file(&repo, "new.md", "new\n", "feature only");
        checkout(&repo, "main");

        let attempt = store(dir.path())
            .attempt_merge("feature", &MergeOptions::default())
            .await
            .unwrap();
        assert_eq!(attempt, MergeAttempt::Merged(feature_sha.to_string()));
        assert!(dir.path().join("new.md").exists());
    }

    #[tokio::test]
    async fn test_squash_commits_single_parent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        branch_from_head(&repo, "feature");
        checkout(&repo, "feature");
        commit_file(&repo, "a.md", "a\n", "a");
        commit_file(&repo, "b.md", "b\n", "b");
        checkout(&repo, "main");

        let options = MergeOptions {
            squash: true,
            message: Some("Squash feature".into()),
            ..MergeOptions::default()
        };
        let MergeAttempt::Merged(sha) = store(dir.path())
            .attempt_merge("feature", &options)
            .await
            .unwrap()
        else {
            panic!("expected squash merge");
        };
        let commit = repo.find_commit(Oid::from_str(&sha).unwrap()).unwrap();
        assert_eq!(commit.parent_count(), 1);
        assert_eq!(commit.message(), Some("Squash feature"));
        assert_eq!(repo.state(), RepositoryState::Clean);
    }

    #[tokio::test]
    async fn test_no_commit_leaves_merge_pending() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        branch_from_head(&repo, "feature");
        commit_file(&repo, "main.md", "m\n", "main");
        checkout(&repo, "feature");
        commit_file(&repo, "feature.md", "f\n", "feature");
        checkout(&repo, "main");

        let store = store(dir.path());
        let before = store.commit_hash().await.unwrap();
        let options = MergeOptions {
            no_commit: true,
            ..MergeOptions::default()
        };
        let attempt = store.attempt_merge("feature", &options).await.unwrap();
        assert_eq!(attempt, MergeAttempt::Merged(before.clone()));
        assert_eq!(repo.state(), RepositoryState::Merge);
        assert!(store.merge_in_progress().await.unwrap());
        assert!(dir.path().join("feature.md").exists());
    }

    #[tokio::test]
    async fn test_conflict_keeps_native_markers_and_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        conflicting_branches(&repo);

        let store = store(dir.path());
        let before = store.commit_hash().await.unwrap();
        let attempt = store
            .attempt_merge("feature", &MergeOptions::default())
            .await
            .unwrap();
        let MergeAttempt::Conflicted(conflicts) = attempt else {
            panic!("expected conflict, got {attempt:?}");
        };
        assert_eq!(conflicts.tree_conflicts, vec!["README.md"]);
        assert_eq!(store.commit_hash().await.unwrap(), before);

        assert_eq!(repo.state(), RepositoryState::Merge);
        let text = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(text.contains("<<<<<<<"));
        assert_eq!(store.list_conflicts().await.unwrap(), conflicts);

        assert!(store.abort_merge().await.unwrap());
        assert!(!store.abort_merge().await.unwrap());
        assert_eq!(repo.state(), RepositoryState::Clean);
        let text = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(text, "hello from main\n");
        assert_eq!(store.commit_hash().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_preview_is_side_effect_free() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        conflicting_branches(&repo);

        let store = store(dir.path());
        let before = store.commit_hash().await.unwrap();
        let first = store.preview_merge("feature", "main").await.unwrap();
        let second = store.preview_merge("feature", "main").await.unwrap();
        assert_eq!(first.tree_conflicts, vec!["README.md"]);
        assert_eq!(first, second);

        assert_eq!(store.commit_hash().await.unwrap(), before);
        assert_eq!(repo.state(), RepositoryState::Clean);
        assert!(!store.merge_in_progress().await.unwrap());
        let text = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(text, "hello from main\n");
    }

    /// main and feature each add a file, so the merge needs a commit.
    fn diverged_branches(repo: &Repository) {
        branch_from_head(repo, "feature");
        commit_file(repo, "main.md", "m\n", "main");
        checkout(repo, "feature");
        commit_file(repo, "feature.md", "f\n", "feature");
        checkout(repo, "main");
    }

    #[test]
    fn test_expired_deadline_leaves_repo_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        diverged_branches(&repo);
        let before = repo.head().unwrap().peel_to_commit().unwrap().id();

        let deadline = Deadline::default();
        deadline.expire();
        let err = merge_branch(&repo, "feature", &MergeOptions::default(), &deadline).unwrap_err();

        assert!(matches!(err, GitError::DeadlineExceeded));
        assert_eq!(repo.head().unwrap().peel_to_commit().unwrap().id(), before);
        assert_eq!(repo.state(), RepositoryState::Clean);
        assert!(!dir.path().join("feature.md").exists());
    }

    #[test]
    fn test_up_to_date_ignores_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        branch_from_head(&repo, "feature");
        let head = repo.head().unwrap().peel_to_commit().unwrap().id();

        let deadline = Deadline::default();
        deadline.expire();
        let attempt = merge_branch(&repo, "feature", &MergeOptions::default(), &deadline).unwrap();
        assert_eq!(attempt, MergeAttempt::Merged(head.to_string()));
    }

    #[tokio::test]
    async fn test_merge_timeout_waits_for_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        diverged_branches(&repo);
        let before = repo.head().unwrap().peel_to_commit().unwrap().id().to_string();

        let timeouts = Timeouts {
            merge: Duration::ZERO,
            ..Timeouts::default()
        };
        let store = GitStore::new(dir.path(), timeouts).unwrap();
        let result = store.attempt_merge("feature", &MergeOptions::default()).await;

        // Whatever was reported is what the repository shows once the call
        // has returned.
        let head = store.commit_hash().await.unwrap();
        match result {
            Err(StoreError::Timeout {
                store: StoreKind::Tree,
                ref operation,
                ..
            }) => {
                assert_eq!(operation, "merge");
                assert_eq!(head, before);
            }
            Ok(MergeAttempt::Merged(sha)) => assert_eq!(head, sha),
            other => panic!("unexpected merge result: {other:?}"),
        }
        assert_eq!(repo.state(), RepositoryState::Clean);
        assert!(!store.merge_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_branch() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let err = store(dir.path())
            .attempt_merge("nope", &MergeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Git(GitError::RefNotFound(_))));
    }

    #[test]
    fn test_repo_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GitStore::new(dir.path().join("missing"), Timeouts::default()),
            Err(GitError::RepositoryNotFound(_))
        ));
    }
}
