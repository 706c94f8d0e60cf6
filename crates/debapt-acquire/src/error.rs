//! Error types for the acquire engine.

use std::path::PathBuf;

use thiserror::Error;

/// Acquire-engine errors.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("could not spawn method '{method}': {message}")]
    Spawn { method: String, message: String },

    #[error("method '{method}' sent a malformed stanza: {message}")]
    Protocol { method: String, message: String },

    #[error("method '{method}' exited unexpectedly")]
    WorkerDied { method: String },

    #[error("no method registered for scheme '{0}'")]
    UnknownScheme(String),

    #[error("lock held on {0}")]
    Locked(PathBuf),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AcquireError>;
