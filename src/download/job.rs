//! Download jobs: temp-file ownership and the one-active-job-per-requester
//! rule.
//!
//! Every temp file is claimed through a [`JobHandle`]; cleanup drains the
//! claimed paths so each path is removed exactly once no matter which side
//! (the job itself or a superseding request) gets there first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Shared handle to one job's temp files.
#[derive(Debug, Default)]
pub struct JobHandle {
    paths: Mutex<Vec<PathBuf>>,
    superseded: AtomicBool,
}

impl JobHandle {
    /// Reserve a uniquely named temp path under `dir` and register it for
    /// cleanup. The file itself is created by the fetcher/merger.
    pub fn claim_temp(&self, dir: &Path, extension: &str) -> PathBuf {
        let path = dir.join(format!("clipferry-{}.{}", Uuid::new_v4(), extension));
        self.lock_paths().push(path.clone());
        path
    }

    /// Whether a newer request from the same requester displaced this job.
    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::SeqCst)
    }

    fn mark_superseded(&self) {
        self.superseded.store(true, Ordering::SeqCst);
    }

    /// Remove every claimed temp file. Idempotent: paths are drained under
    /// the lock, so concurrent callers never remove the same path twice.
    /// Never fails; missing files are fine, other errors are logged.
    pub async fn cleanup(&self) {
        let paths: Vec<PathBuf> = self.lock_paths().drain(..).collect();
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => log::debug!("Removed temp file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove temp file {}: {}", path.display(), e),
            }
        }
    }

    fn lock_paths(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        match self.paths.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// At most one job per requester holds undeleted temp files. Starting a new
/// job displaces the previous one; the caller cleans the displaced handle.
#[derive(Debug, Default)]
pub struct JobRegistry {
    active: Mutex<HashMap<i64, Arc<JobHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job for the requester. Returns the new handle plus the
    /// displaced one (already marked superseded) for the caller to clean up.
    pub fn begin(&self, requester: i64) -> (Arc<JobHandle>, Option<Arc<JobHandle>>) {
        let handle = Arc::new(JobHandle::default());
        let previous = self.lock_active().insert(requester, Arc::clone(&handle));
        if let Some(prev) = &previous {
            prev.mark_superseded();
        }
        (handle, previous)
    }

    /// Deregister the job, but only if it is still the requester's active
    /// one; a superseding job must not be evicted by its predecessor.
    pub fn finish(&self, requester: i64, handle: &Arc<JobHandle>) {
        let mut active = self.lock_active();
        if active.get(&requester).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            active.remove(&requester);
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<i64, Arc<JobHandle>>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
