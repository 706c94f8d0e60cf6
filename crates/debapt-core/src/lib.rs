//! Shared foundations for the apt-rs workspace.
//!
//! This crate is the one leaf every other crate depends on: interned
//! strings, the typed entity ids used instead of raw pointers into the
//! package cache's mmap image, and the error/diagnostics taxonomy described
//! in `spec.md` §7.

#![warn(clippy::all)]

pub mod arena;
pub mod diag;
pub mod error;
pub mod ids;
pub mod logging;

pub use arena::{StringArena, StringPool};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use ids::{DepId, DescId, GrpId, PkgFileId, PkgId, RlsFileId, StrId, VerId};

pub use ahash::{AHashMap, AHashSet};
pub use dashmap::DashMap;
pub use parking_lot::{Mutex, RwLock};

/// Global allocator. apt's own process handles tens of thousands of small,
/// short-lived allocations during cache generation and solving; mimalloc's
/// thread caches pay for themselves there.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
