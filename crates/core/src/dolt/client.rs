//! Row-store adapter driving the `dolt` CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::parser::{
    parse_column_names, parse_conflict_summary, parse_row_conflicts, parse_sql_rows, scalar,
    truthy, SqlRow,
};
use crate::conflict::MergeConflicts;
use crate::errors::{DoltError, StoreError};
use crate::store::{MergeAttempt, MergeOptions, RowStore, StoreKind, Timeouts, VersionedStore};

/// Captured result of one `dolt` invocation.
#[derive(Debug)]
struct DoltOutput {
    success: bool,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// Row store backed by a local dolt repository.
#[derive(Debug, Clone)]
pub struct DoltStore {
    repo_path: PathBuf,
    binary: String,
    timeouts: Timeouts,
}

impl DoltStore {
    /// Open the dolt repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(
        repo_path: P,
        binary: impl Into<String>,
        timeouts: Timeouts,
    ) -> Result<Self, DoltError> {
        let path = repo_path.as_ref();
        if !path.join(".dolt").is_dir() {
            return Err(DoltError::RepositoryNotFound(path.display().to_string()));
        }
        let store = Self {
            repo_path: path.to_path_buf(),
            binary: binary.into(),
            timeouts,
        };
        info!(path = %store.repo_path.display(), binary = %store.binary, "opened dolt store");
        Ok(store)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run `dolt <args>` in the repository, bounded by `timeout`. A non-zero
    /// exit is returned as data, not as an error.
    async fn run(
        &self,
        operation: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<DoltOutput, StoreError> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.repo_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(cmd = ?format!("{} {}", self.binary, args.join(" ")), "running dolt command");
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => {
                warn!(operation, timeout_secs = timeout.as_secs(), "dolt command timed out");
                return Err(StoreError::Timeout {
                    store: StoreKind::Row,
                    operation: operation.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DoltError::BinaryNotFound(self.binary.clone())
                } else {
                    DoltError::IoError(e)
                }
            })?,
        };

        Ok(DoltOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a command and fail on non-zero exit.
    async fn run_checked(
        &self,
        operation: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, StoreError> {
        let out = self.run(operation, args, timeout).await?;
        if !out.success {
            warn!(operation, exit_code = out.exit_code, stderr = %out.stderr, "dolt command failed");
            return Err(command_failed(&out).into());
        }
        Ok(out.stdout)
    }

    /// Run a query with JSON result format.
    async fn query(&self, operation: &str, sql: &str) -> Result<Vec<SqlRow>, StoreError> {
        let stdout = self
            .run_checked(operation, &["sql", "-r", "json", "-q", sql], self.timeouts.metadata)
            .await?;
        Ok(parse_sql_rows(&stdout)?)
    }

    async fn conflicted_tables(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let rows = self
            .query("conflict summary", "SELECT `table`, num_conflicts FROM dolt_conflicts")
            .await?;
        Ok(parse_conflict_summary(&rows))
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT column_name FROM information_schema.key_column_usage \
             WHERE table_schema = DATABASE() AND table_name = '{}' AND constraint_name = 'PRIMARY' \
             ORDER BY ordinal_position",
            sql_string(table)
        );
        let rows = self.query("primary key lookup", &sql).await?;
        Ok(parse_column_names(&rows))
    }

    async fn is_merging(&self) -> Result<bool, StoreError> {
        let rows = self
            .query("merge status", "SELECT is_merging FROM dolt_merge_status")
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("is_merging"))
            .is_some_and(truthy))
    }

    /// Run a no-commit merge of `source` and report its conflicts. Leaves
    /// the merge in progress; callers must undo it.
    async fn speculative_conflicts(&self, source: &str) -> Result<MergeConflicts, StoreError> {
        let out = self
            .run(
                "preview merge",
                &["merge", "--no-commit", "--no-ff", source],
                self.timeouts.merge,
            )
            .await?;
        if !self.conflicted_tables().await?.is_empty() {
            return self.list_conflicts().await;
        }
        if !out.success {
            return Err(command_failed(&out).into());
        }
        Ok(MergeConflicts::default())
    }

    /// Undo a speculative merge: abort if a merge is in progress, then reset
    /// to `pre` if HEAD moved.
    async fn undo_speculative(&self, pre: &str) -> Result<(), StoreError> {
        if self.is_merging().await? || !self.conflicted_tables().await?.is_empty() {
            self.run_checked("merge --abort", &["merge", "--abort"], self.timeouts.merge)
                .await?;
        }
        if self.commit_hash().await? != pre {
            self.reset_to(pre).await?;
        }
        Ok(())
    }
}

impl VersionedStore for DoltStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Row
    }

    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn current_branch(&self) -> Result<String, StoreError> {
        let rows = self
            .query("current branch", "SELECT active_branch() AS branch")
            .await?;
        match scalar(&rows) {
            Some(branch) if !branch.trim().is_empty() => Ok(branch.trim().to_string()),
            _ => Err(StoreError::Detached {
                store: StoreKind::Row,
            }),
        }
    }

    async fn commit_hash(&self) -> Result<String, StoreError> {
        let rows = self.query("commit hash", "SELECT HASHOF('HEAD') AS hash").await?;
        scalar(&rows)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DoltError::OutputParseError("HASHOF('HEAD') returned no hash".into()).into())
    }

    #[instrument(skip(self, options), fields(path = %self.repo_path.display()))]
    async fn attempt_merge(
        &self,
        source: &str,
        options: &MergeOptions,
    ) -> Result<MergeAttempt, StoreError> {
        let mut args = vec!["merge"];
        if options.no_commit {
            args.push("--no-commit");
        }
        if options.squash {
            args.push("--squash");
        }
        if let Some(message) = options.message.as_deref() {
            args.push("-m");
            args.push(message);
        }
        args.push(source);

        let out = self.run("merge", &args, self.timeouts.merge).await?;

        // Dolt may exit non-zero on conflicts; the conflict tables are the
        // source of truth.
        if !self.conflicted_tables().await?.is_empty() {
            let conflicts = self.list_conflicts().await?;
            info!(count = conflicts.row_conflicts.len(), "dolt merge stopped on conflicts");
            return Ok(MergeAttempt::Conflicted(conflicts));
        }
        if !out.success {
            warn!(exit_code = out.exit_code, stderr = %out.stderr, "dolt merge failed");
            return Err(command_failed(&out).into());
        }

        let hash = self.commit_hash().await?;
        info!(source, commit = %hash, "dolt merge completed");
        Ok(MergeAttempt::Merged(hash))
    }

    async fn list_conflicts(&self) -> Result<MergeConflicts, StoreError> {
        let mut row_conflicts = Vec::new();
        for (table, count) in self.conflicted_tables().await? {
            let pk = self.primary_key_columns(&table).await?;
            let sql = format!("SELECT * FROM `{}`", sql_identifier(&format!("dolt_conflicts_{table}")));
            let rows = self.query("conflict rows", &sql).await?;
            let parsed = parse_row_conflicts(&table, &pk, &rows);
            if parsed.len() as u64 != count {
                warn!(table = %table, expected = count, found = parsed.len(), "conflict count mismatch");
            }
            row_conflicts.extend(parsed);
        }
        Ok(MergeConflicts::rows(row_conflicts))
    }

    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn abort_merge(&self) -> Result<bool, StoreError> {
        if !self.merge_in_progress().await? {
            debug!("no dolt merge in progress");
            return Ok(false);
        }
        self.run_checked("merge --abort", &["merge", "--abort"], self.timeouts.merge)
            .await?;
        info!("dolt merge aborted");
        Ok(true)
    }

    async fn merge_in_progress(&self) -> Result<bool, StoreError> {
        Ok(self.is_merging().await? || !self.conflicted_tables().await?.is_empty())
    }

    /// Speculative merge on the checked-out target branch, always undone.
    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn preview_merge(&self, source: &str, target: &str) -> Result<MergeConflicts, StoreError> {
        let current = self.current_branch().await?;
        if current != target {
            return Err(StoreError::InvalidState {
                store: StoreKind::Row,
                detail: format!(
                    "dry run needs '{target}' checked out in the row store (currently on '{current}')"
                ),
            });
        }
        if self.merge_in_progress().await? {
            return Err(StoreError::InvalidState {
                store: StoreKind::Row,
                detail: "a merge is already in progress; abort it before a dry run".into(),
            });
        }

        let pre = self.commit_hash().await?;
        let result = self.speculative_conflicts(source).await;

        // Undo regardless of how the preview went.
        self.undo_speculative(&pre).await?;
        debug!(source, target, "dolt preview undone");
        result
    }
}

impl RowStore for DoltStore {
    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    async fn reset_to(&self, commit: &str) -> Result<(), StoreError> {
        if !is_commit_hash(commit) {
            return Err(DoltError::InvalidCommit(commit.to_string()).into());
        }
        self.run_checked("reset --hard", &["reset", "--hard", commit], self.timeouts.merge)
            .await?;
        info!(commit, "dolt store reset");
        Ok(())
    }
}

fn command_failed(out: &DoltOutput) -> DoltError {
    let stderr = if out.stderr.trim().is_empty() {
        out.stdout.trim().to_string()
    } else {
        out.stderr.trim().to_string()
    };
    DoltError::CommandFailed {
        exit_code: out.exit_code,
        stderr,
    }
}

/// Dolt commit hashes are 32 base32 characters (`0-9a-v`).
fn is_commit_hash(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && s.chars().all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c))
}

/// Escape a value for a single-quoted SQL string literal.
fn sql_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

/// Escape a name for a backtick-quoted SQL identifier.
fn sql_identifier(s: &str) -> String {
    s.replace('`', "``")
}
