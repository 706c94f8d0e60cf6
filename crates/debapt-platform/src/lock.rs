//! Advisory file locking, the Rust analog of apt's `GetLock`/`FileFd::Lock`.
//!
//! The original opens (creating if needed) a `lock` file inside the
//! directory being protected and takes an exclusive `fcntl` lock on it,
//! non-blocking, so a second apt process fails fast with "could not get
//! lock" instead of hanging. We do the same with `nix::fcntl::flock`.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{FlockArg, flock};

/// Why a lock could not be acquired.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not get lock {path} -- open files? {message}")]
    Contended { path: PathBuf, message: String },
}

/// A held advisory lock. Dropping it releases the lock and closes the file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    // Held only for its Drop impl (closes the fd, releasing the flock).
    _file: File,
}

impl FileLock {
    /// Take an exclusive, non-blocking lock on `dir/lock`, creating the
    /// directory and the lock file if they don't already exist.
    ///
    /// Returns `Ok(None)` rather than erroring when `debug_no_locking` is
    /// set, mirroring apt's `Debug::NoLocking` escape hatch used in test
    /// harnesses and chroots without write access to `/var/lib`.
    pub fn acquire(dir: &Path, debug_no_locking: bool) -> Result<Option<Self>, LockError> {
        if debug_no_locking {
            return Ok(None);
        }
        std::fs::create_dir_all(dir).map_err(|source| LockError::Open {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open { path: path.clone(), source })?;

        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => Ok(Some(Self { path, _file: file })),
            Err(errno) => Err(LockError::Contended { path, message: errno.to_string() }),
        }
    }

    /// The lock file's path, for diagnostics.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
