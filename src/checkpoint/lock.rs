//! Exclusive per-run ledger lock.

use super::CheckpointError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard proving this process owns a run's ledger.
///
/// The lock is an OS advisory lock on `<root>/<run key>.lock`, released when
/// the guard drops (or the process dies). The lock file itself is left in
/// place; removing it could let two processes lock different inodes.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting.
    ///
    /// Fails with [`CheckpointError::Locked`] if another holder exists.
    pub fn acquire(path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CheckpointError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CheckpointError::io(path, e))?;

        file.try_lock_exclusive()
            .map_err(|_| CheckpointError::Locked(path.to_path_buf()))?;

        debug!(lock = %path.display(), "Acquired run lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
