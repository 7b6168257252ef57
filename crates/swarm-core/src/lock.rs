//! Advisory cross-process store lock. Exclusivity comes from the operating
//! system's file locking (via `fs2`); in-process callers are expected to be
//! sequential, so no additional mutex sits in front of it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;

use crate::error::{Result, StoreError};

const MAX_ATTEMPTS: u32 = 10;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Exclusive lock on the store lockfile, released on drop. Holding the
/// guard for the duration of an operation gives release-on-error for free.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire with bounded retry: up to 10 attempts with backoff doubling
    /// from 100ms, capped at 1s between attempts.
    pub fn acquire(path: &Path) -> Result<StoreLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_ATTEMPTS {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(StoreLock {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(err) => {
                    log::debug!(
                        "lock attempt {attempt}/{MAX_ATTEMPTS} on {} failed: {err}",
                        path.display()
                    );
                }
            }
            if attempt < MAX_ATTEMPTS {
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
        Err(StoreError::LockTimeout(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("failed to release lock {}: {err}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_and_release() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("lockfile");
        {
            let _lock = StoreLock::acquire(&path).expect("acquire");
            assert!(path.is_file());
        }
        // Released on drop; a second acquisition succeeds immediately.
        let _lock = StoreLock::acquire(&path).expect("reacquire");
    }

    #[test]
    fn sequential_acquisitions_do_not_block() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("lockfile");
        for _ in 0..3 {
            let _lock = StoreLock::acquire(&path).expect("acquire");
        }
    }
}
