//! Per-version download metadata kept alongside the binary cache.
//!
//! Real apt doesn't store a version's `Filename`/hash in `pkgCache`
//! itself -- `pkgRecords` re-parses the original `Packages` text lazily,
//! keyed by the byte offset `pkgCache::VerFileIterator` remembers. We
//! don't keep the original text around, so instead of re-deriving an
//! offset-into-file scheme, [`Records`] is a small in-memory side table
//! built once during merge, keyed by the same [`VerId`] the binary cache
//! uses -- the same separation of concerns (mmap'd cache vs.
//! fetch-only metadata), without the re-parse step.

use std::collections::HashMap;

use debapt_core::ids::VerId;

/// What's needed to fetch and verify one version's `.deb`.
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    /// Path relative to the repository root, from the stanza's `Filename`.
    pub filename: String,
    pub sha256: Option<String>,
    pub size: u64,
}

/// `VerId -> DownloadRecord`, populated once per merged `Packages` file.
pub type Records = HashMap<VerId, DownloadRecord>;
