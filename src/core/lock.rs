//! core::lock
//!
//! Advisory workspace lock for callers that mix reads and checkouts.
//!
//! # Contract
//!
//! [`crate::git::Repository`] has no lock of its own. Read operations may
//! run concurrently, but a checkout rewrites the working directory those
//! reads observe, so it needs exclusive access. Serializing them is the
//! caller's job; this module gives callers a ready-made way to do it.
//!
//! - [`LockMode::Shared`] for diffs, walks and lookups
//! - [`LockMode::Exclusive`] for checkouts
//!
//! The lock lives at `<git_dir>/vcscope/lock` and uses OS-level file locks
//! via `fs2`, so it works across processes. Acquisition is non-blocking.
//!
//! # Example
//!
//! ```ignore
//! use vcscope::core::lock::{LockMode, WorkspaceLock};
//! use vcscope::core::paths::ScopePaths;
//!
//! let paths = ScopePaths::new(repo.git_dir().to_path_buf());
//! let _guard = WorkspaceLock::acquire(&paths, LockMode::Exclusive)?;
//! repo.checkout(&commit)?;
//! // released on drop
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::ScopePaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds a conflicting lock.
    #[error("workspace is locked by another process ({mode} lock requested)")]
    AlreadyLocked {
        /// The mode that could not be acquired
        mode: LockMode,
    },

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// Lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many holders; excludes exclusive holders.
    Shared,
    /// Single holder; excludes everyone else.
    Exclusive,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// A held workspace lock. Released on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    mode: LockMode,
    file: Option<File>,
}

impl WorkspaceLock {
    /// Attempt to acquire the lock in the given mode.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if a conflicting lock is held
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(paths: &ScopePaths, mode: LockMode) -> Result<Self, LockError> {
        paths.ensure_dir().map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", paths.scope_dir().display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        let attempt = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };

        match attempt {
            Ok(()) => {
                log::debug!("acquired {} lock at {}", mode, path.display());
                Ok(Self {
                    path,
                    mode,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked { mode })
            }
            // fs2 reports contention as a raw OS error on some platforms
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(LockError::AlreadyLocked { mode })
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire the lock, returning `None` if it is held elsewhere.
    pub fn try_acquire(paths: &ScopePaths, mode: LockMode) -> Result<Option<Self>, LockError> {
        match Self::acquire(paths, mode) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// The mode the lock was taken in.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file).map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(dir: &Path) -> ScopePaths {
        ScopePaths::new(dir.to_path_buf())
    }

    #[test]
    fn exclusive_acquire_succeeds() {
        let temp = TempDir::new().unwrap();
        let lock = WorkspaceLock::acquire(&test_paths(temp.path()), LockMode::Exclusive).unwrap();
        assert!(lock.is_held());
        assert_eq!(lock.mode(), LockMode::Exclusive);
        assert!(lock.path().exists());
    }

    #[test]
    fn exclusive_excludes_second_exclusive() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        let _held = WorkspaceLock::acquire(&paths, LockMode::Exclusive).unwrap();

        let second = WorkspaceLock::acquire(&paths, LockMode::Exclusive);
        assert!(matches!(second, Err(LockError::AlreadyLocked { .. })));
    }

    #[test]
    fn shared_locks_coexist() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        let _a = WorkspaceLock::acquire(&paths, LockMode::Shared).unwrap();
        let b = WorkspaceLock::try_acquire(&paths, LockMode::Shared).unwrap();
        assert!(b.is_some());
    }

    #[test]
    fn shared_excludes_exclusive() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        let _reader = WorkspaceLock::acquire(&paths, LockMode::Shared).unwrap();

        let writer = WorkspaceLock::try_acquire(&paths, LockMode::Exclusive).unwrap();
        assert!(writer.is_none());
    }

    #[test]
    fn release_allows_reacquire() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let mut lock = WorkspaceLock::acquire(&paths, LockMode::Exclusive).unwrap();
        lock.release().unwrap();
        assert!(!lock.is_held());

        let again = WorkspaceLock::acquire(&paths, LockMode::Exclusive);
        assert!(again.is_ok());
    }

    #[test]
    fn drop_releases() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        {
            let _lock = WorkspaceLock::acquire(&paths, LockMode::Exclusive).unwrap();
        }
        assert!(WorkspaceLock::acquire(&paths, LockMode::Exclusive).is_ok());
    }
}
