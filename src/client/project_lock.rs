//! Per-project run serialization
//!
//! Two layers:
//! 1. In-memory mutex per project (in-process) - tasks of this process queue up
//! 2. Filesystem lock (cross-process) - another process holding the project waits us out
//!
//! Runs for different projects never contend.

use super::fs_lock::FsLockGuard;
use crate::error::InsightError;
use anyhow::Context;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub(crate) struct ProjectLocks {
    lock_dir: PathBuf,
    timeout: Duration,
    in_process: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one run; dropping it releases both layers
pub(crate) struct ProjectLockGuard {
    project: String,
    // Released in reverse order of acquisition: file lock first
    _fs_lock: FsLockGuard,
    _in_process: OwnedMutexGuard<()>,
}

impl Drop for ProjectLockGuard {
    fn drop(&mut self) {
        tracing::debug!("Released lock for project {}", self.project);
    }
}

impl ProjectLocks {
    pub(crate) fn new(lock_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            lock_dir,
            timeout,
            in_process: Mutex::new(HashMap::new()),
        }
    }

    fn project_mutex(&self, project: &str) -> Result<Arc<AsyncMutex<()>>, InsightError> {
        let mut map = self
            .in_process
            .lock()
            .map_err(|_| InsightError::other("Project lock table poisoned"))?;
        Ok(map
            .entry(project.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Wait for exclusive access to a project, up to the configured timeout
    pub(crate) async fn acquire(&self, project: &str) -> Result<ProjectLockGuard, InsightError> {
        let start = Instant::now();
        let mutex = self.project_mutex(project)?;

        let in_process = tokio::time::timeout(self.timeout, mutex.lock_owned())
            .await
            .map_err(|_| self.timed_out(project))?;

        let remaining = self.timeout.saturating_sub(start.elapsed());
        let lock_dir = self.lock_dir.clone();
        let name = project.to_string();
        let fs_lock = tokio::task::spawn_blocking(move || {
            FsLockGuard::acquire_blocking(&lock_dir, &name, remaining)
        })
        .await
        .context("Filesystem lock task panicked")??
        .ok_or_else(|| self.timed_out(project))?;

        tracing::debug!("Acquired lock for project {} in {:?}", project, start.elapsed());
        Ok(ProjectLockGuard {
            project: project.to_string(),
            _fs_lock: fs_lock,
            _in_process: in_process,
        })
    }

    fn timed_out(&self, project: &str) -> InsightError {
        InsightError::other(format!(
            "Timed out after {:?} waiting for another run on project '{}' to finish",
            self.timeout, project
        ))
    }
}
