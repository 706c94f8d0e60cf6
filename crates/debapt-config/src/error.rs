//! Errors raised while loading configuration or parsing a sources list.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed sources.list entry: {message}")]
    MalformedEntry { path: PathBuf, line: usize, message: String },

    #[error("{path}:{line}: unknown option key '{key}'")]
    UnknownOption { path: PathBuf, line: usize, key: String },
}
