use conduit_fs::{LockFile, NormalizedPath};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Error, Result};

/// Per-definition run locks
///
/// Locks are always tracked in-process. With a lock directory, an exclusive
/// `fs2` lock on `synchronization-<id>.lock` also excludes other processes.
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    active: Arc<Mutex<HashSet<i64>>>,
    lock_dir: Option<NormalizedPath>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_dir(lock_dir: impl Into<NormalizedPath>) -> Self {
        Self {
            active: Arc::default(),
            lock_dir: Some(lock_dir.into()),
        }
    }

    /// Take the lock for `synchronization_id` without waiting.
    ///
    /// # Errors
    ///
    /// [`Error::RunInProgress`] when another run holds it.
    pub fn acquire(&self, synchronization_id: i64) -> Result<RunGuard> {
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if !active.insert(synchronization_id) {
                return Err(Error::RunInProgress {
                    id: synchronization_id,
                });
            }
        }

        // The guard releases the in-process slot if the file lock fails.
        let mut guard = RunGuard {
            id: synchronization_id,
            active: Arc::clone(&self.active),
            _file: None,
        };

        if let Some(dir) = &self.lock_dir {
            let path = dir.join(&format!("synchronization-{synchronization_id}.lock"));
            match LockFile::try_acquire(&path) {
                Ok(file) => guard._file = Some(file),
                Err(conduit_fs::Error::LockContended { .. }) => {
                    return Err(Error::RunInProgress {
                        id: synchronization_id,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(synchronization_id, "Acquired run lock");
        Ok(guard)
    }

    pub fn is_running(&self, synchronization_id: i64) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&synchronization_id)
    }
}

/// Held for the duration of a run; releases the lock on drop
#[derive(Debug)]
pub struct RunGuard {
    id: i64,
    active: Arc<Mutex<HashSet<i64>>>,
    _file: Option<LockFile>,
}

impl RunGuard {
    pub fn synchronization_id(&self) -> i64 {
        self.id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        tracing::debug!(synchronization_id = self.id, "Released run lock");
    }
}
