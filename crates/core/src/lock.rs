//! Exclusive advisory lock over the project's working directory.
//!
//! One coordinator invocation at a time may touch the stores. The lock is a
//! `flock`-style lock on `<control dir>/merge.lock`, released when the
//! [`MergeLock`] is dropped or the process exits.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::errors::LockError;

/// File name of the lock inside the control directory.
pub const LOCK_FILE_NAME: &str = "merge.lock";

/// Get the lock file path for a control directory.
pub fn lock_file_path(control_dir: &Path) -> PathBuf {
    control_dir.join(LOCK_FILE_NAME)
}

/// Held advisory lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct MergeLock {
    file: File,
    path: PathBuf,
}

impl MergeLock {
    /// Take the lock without waiting. Fails with [`LockError::AlreadyHeld`]
    /// when another holder exists.
    pub fn acquire(control_dir: &Path) -> Result<Self, LockError> {
        let path = lock_file_path(control_dir);
        let io_err = |source| LockError::IoError {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(control_dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;

        file.try_lock_exclusive().map_err(|_| LockError::AlreadyHeld {
            path: path.display().to_string(),
        })?;

        // Holder PID is informational only; the flock is what excludes.
        let pid = std::process::id();
        file.set_len(0).map_err(io_err)?;
        write!(file, "{pid}").map_err(io_err)?;
        info!(pid, path = %path.display(), "acquired merge lock");

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MergeLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release merge lock");
        } else {
            debug!(path = %self.path.display(), "released merge lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = MergeLock::acquire(dir.path()).unwrap();
        assert_eq!(lock.path(), lock_file_path(dir.path()));

        let err = MergeLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, LockError::AlreadyHeld { .. }));
    }

    #[test]
    fn test_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        drop(MergeLock::acquire(dir.path()).unwrap());
        MergeLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_creates_control_dir_and_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join(".lockstep");
        let _lock = MergeLock::acquire(&control).unwrap();
        let contents = fs::read_to_string(lock_file_path(&control)).unwrap();
        assert_eq!(contents, std::process::id().to_string());
    }
}
