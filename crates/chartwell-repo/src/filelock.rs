//! Cross-process advisory lock guarding registry mutations

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::error::{RepoError, Result};
use crate::settings::LockOptions;

/// Exclusive lock on a lock file. Unlocks on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released lock {}", self.path.display());
    }
}

/// Advisory file lock acquisition
pub struct FileLock;

impl FileLock {
    /// Acquire an exclusive lock on `path`, polling until `options.timeout`
    ///
    /// The lock file is created if needed and never deleted, since removing
    /// it would let two processes lock different inodes.
    pub async fn acquire(path: &Path, options: LockOptions) -> Result<FileLockGuard> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| RepoError::io(path, e))?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(true) => {
                    debug!("Acquired lock {}", path.display());
                    return Ok(FileLockGuard {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Ok(false) => {}
                Err(e) => return Err(RepoError::io(path, e)),
            }

            let waited = start.elapsed();
            if waited >= options.timeout {
                return Err(RepoError::LockTimeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }

            debug!("Waiting for lock {}", path.display());
            let remaining = options.timeout - waited;
            tokio::time::sleep(options.poll_interval.min(remaining)).await;
        }
    }
}
