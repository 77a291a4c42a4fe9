//! Filesystem-based locking for cross-process coordination
//!
//! Two processes ingesting the same project would race on its snapshot and summary
//! store. An exclusive flock() on a per-project lock file serializes them; the
//! in-process half lives in `project_lock.rs`.

use anyhow::{Context, Result};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lock file for a project: `{lock_dir}/{sha256(project)[..16]}.lock`
pub(crate) fn lock_file_path(lock_dir: &Path, project: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(project.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

/// Guard that holds an exclusive filesystem lock
///
/// The lock is released when the guard is dropped, or by the OS if the process dies.
pub struct FsLockGuard {
    _file: File,
    path: PathBuf,
}

impl FsLockGuard {
    /// Try to acquire an exclusive filesystem lock, non-blocking
    ///
    /// Returns:
    /// - `Ok(Some(guard))` if the lock was acquired
    /// - `Ok(None)` if another process holds the lock
    /// - `Err(...)` on IO errors
    pub fn try_acquire(lock_dir: &Path, project: &str) -> Result<Option<Self>> {
        let lock_path = lock_file_path(lock_dir, project);

        fs::create_dir_all(lock_dir).context("Failed to create lock directory")?;
        let file = File::create(&lock_path).context("Failed to create lock file")?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired filesystem lock for project {} ({:?})", project, lock_path);
                Ok(Some(Self {
                    _file: file,
                    path: lock_path,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // fs2 reports contention as its own error kind on some platforms
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e).context("Failed to acquire filesystem lock"),
        }
    }

    /// Acquire the lock, polling until it is free or `timeout` expires (`Ok(None)`)
    pub fn acquire_blocking(lock_dir: &Path, project: &str, timeout: Duration) -> Result<Option<Self>> {
        let start = Instant::now();
        let sleep_interval = Duration::from_millis(100);
        let mut announced = false;

        loop {
            if let Some(guard) = Self::try_acquire(lock_dir, project)? {
                if announced {
                    tracing::info!("Acquired filesystem lock after {:?}", start.elapsed());
                }
                return Ok(Some(guard));
            }

            if start.elapsed() >= timeout {
                tracing::warn!(
                    "Timeout waiting for filesystem lock on project {} after {:?}",
                    project,
                    timeout
                );
                return Ok(None);
            }
            if !announced {
                tracing::info!(
                    "Project {} is locked by another process, waiting (timeout: {:?})",
                    project,
                    timeout
                );
                announced = true;
            }
            std::thread::sleep(sleep_interval);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        // The lock file is kept for reuse
        tracing::debug!("Releasing filesystem lock {:?}", self.path);
    }
}
