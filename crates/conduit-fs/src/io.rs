//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
/// Every call gets its own temp file, so concurrent writers in one process
/// never share a handle; the last rename wins.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let written = temp_file
        .write_all(content)
        .and_then(|_| temp_file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;
    drop(temp_file);

    if let Err(e) = fs::rename(&temp_path, &native_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&native_path, e));
    }

    tracing::trace!(path = %path, bytes = content.len(), "Wrote file atomically");
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content, returning `None` when the file does not exist.
pub fn read_text_if_exists(path: &NormalizedPath) -> Result<Option<String>> {
    let native_path = path.to_native();
    match fs::read_to_string(&native_path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// An exclusive advisory lock on a file, released on drop.
///
/// Used to keep separate processes from running the same unit of work
/// against a shared data directory.
#[derive(Debug)]
pub struct LockFile {
    path: NormalizedPath,
    file: File,
}

impl LockFile {
    /// Try to take the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockContended`] if another handle holds the lock.
    pub fn try_acquire(path: &NormalizedPath) -> Result<Self> {
        let native_path = path.to_native();
        if let Some(parent) = native_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&native_path)
            .map_err(|e| Error::io(&native_path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.clone(),
                file,
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(Error::LockContended { path: native_path })
            }
            Err(_) => Err(Error::LockFailed { path: native_path }),
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_text_if_exists_returns_none_for_missing_file() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("missing.json"));
        assert!(read_text_if_exists(&path).unwrap().is_none());
    }

    #[test]
    fn lock_file_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("locks").join("sync-1.lock"));

        let first = LockFile::try_acquire(&path).unwrap();
        let second = LockFile::try_acquire(&path);
        assert!(matches!(second, Err(Error::LockContended { .. })));

        drop(first);
        assert!(LockFile::try_acquire(&path).is_ok());
    }
}
