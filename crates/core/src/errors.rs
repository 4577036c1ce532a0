//! Error types for the Lockstep core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type. The merge-level failure taxonomy lives in
//! [`crate::merge::MergeFailure`]; everything here is wrapped into it before
//! crossing the coordinator boundary.

use thiserror::Error;

use crate::store::StoreKind;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Dolt errors
// ---------------------------------------------------------------------------

/// Errors from `dolt` CLI operations.
#[derive(Debug, Error)]
pub enum DoltError {
    /// The `dolt` binary was not found on `$PATH`.
    #[error("dolt binary not found: {0}")]
    BinaryNotFound(String),

    /// A `dolt` command exited with a non-zero status.
    #[error("dolt command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// Could not parse the JSON result set produced by `dolt sql`.
    #[error("failed to parse dolt output: {0}")]
    OutputParseError(String),

    /// A commit reference that is not a plain commit hash.
    #[error("invalid dolt commit reference '{0}'")]
    InvalidCommit(String),

    /// The configured row-store directory is not a dolt repository.
    #[error("dolt repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// Generic I/O wrapper.
    #[error("dolt I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// HEAD does not point at a local branch.
    #[error("git HEAD is detached")]
    Detached,

    /// A write stopped at a checkpoint because its timeout had passed.
    #[error("git operation stopped after its deadline")]
    DeadlineExceeded,

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Store adapter errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`crate::store::VersionedStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Dolt(#[from] DoltError),

    #[error(transparent)]
    Git(#[from] GitError),

    /// An engine call exceeded its time budget. Never retried.
    #[error("{store} store operation '{operation}' timed out after {timeout_secs}s")]
    Timeout {
        store: StoreKind,
        operation: String,
        timeout_secs: u64,
    },

    /// The working copy is not on a branch.
    #[error("{store} store is not on a branch (detached or ambiguous HEAD)")]
    Detached { store: StoreKind },

    /// The store is in a state the requested operation cannot work from.
    #[error("{store} store: {detail}")]
    InvalidState { store: StoreKind, detail: String },

    /// A blocking engine task panicked or was cancelled.
    #[error("{store} store task failed: {detail}")]
    TaskFailed { store: StoreKind, detail: String },
}

// ---------------------------------------------------------------------------
// Lock errors
// ---------------------------------------------------------------------------

/// Errors from the advisory merge lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("another merge is in progress (lock held at '{path}')")]
    AlreadyHeld { path: String },

    /// Generic I/O error creating or opening the lock file.
    #[error("lock file I/O error at '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
