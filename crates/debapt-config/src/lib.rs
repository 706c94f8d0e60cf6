//! Immutable configuration tree and sources.list parsing.
//!
//! Built once at process startup from defaults, the environment, and the
//! sources list, then handed around as `Arc<Config>`; nothing mutates it
//! afterward.

#![warn(clippy::all)]

pub mod env;
pub mod error;
pub mod sources;
pub mod types;

pub use error::{ConfigError, Result};
pub use sources::{SourceEntry, SourceOptions, SourceType};
pub use types::{AcquireConfig, Config, DirLayout, InstallPolicy, ProxyConfig, QueueMode, SandboxConfig};
