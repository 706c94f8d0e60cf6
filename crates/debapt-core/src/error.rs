//! Abort-the-operation errors, as opposed to the accumulate-and-continue
//! [`crate::diag::Diagnostics`].
//!
//! `spec.md` §7 splits failure into two tiers: conditions a caller can
//! recover from by trying something else (hash mismatch, one mirror down)
//! go through `Diagnostics`; conditions that make continuing pointless
//! (can't open the cache, can't take the lock, I/O failed outright) are a
//! hard `Err` here.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort the current operation outright.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not acquire lock {path}: {reason}")]
    Lock { path: PathBuf, reason: String },

    #[error("cache is corrupt: {0}")]
    CorruptCache(String),

    #[error("malformed control data: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an I/O error with the path that was being operated on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// A lock-contention error, e.g. another apt process holds `/var/lib/dpkg/lock`.
    #[must_use]
    pub fn lock(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Lock { path: path.into(), reason: reason.into() }
    }
}
