//! `Item`: one logical artifact to fetch (`spec.md` §4.5), and the
//! hash-merging/coalescing rules a `Queue` applies across its owners.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// An item's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Idle,
    Fetching,
    Done,
    Error,
    AuthError,
    TransientError,
}

/// `FailReason` strings the engine matches on to decide retryability
/// (`spec.md` §6): contractual, not free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    HashSumMismatch,
    WeakHashSums,
    MaximumSizeExceeded,
    RedirectionLoop,
    HttpError(u16),
    Other(String),
}

impl FailReason {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Other(_) => true,
            Self::HttpError(code) => *code >= 500,
            Self::HashSumMismatch | Self::WeakHashSums | Self::MaximumSizeExceeded | Self::RedirectionLoop => false,
        }
    }

    #[must_use]
    pub fn as_tag(&self) -> String {
        match self {
            Self::HashSumMismatch => "HashSumMismatch".to_owned(),
            Self::WeakHashSums => "WeakHashSums".to_owned(),
            Self::MaximumSizeExceeded => "MaximumSizeExceeded".to_owned(),
            Self::RedirectionLoop => "RedirectionLoop".to_owned(),
            Self::HttpError(code) => format!("HttpError{code}"),
            Self::Other(s) => s.clone(),
        }
    }
}

/// One expected hash, keyed by algorithm name as it appears on the wire
/// (`MD5Sum`, `SHA1`, `SHA256`, ...).
pub type ExpectedHashes = BTreeMap<String, String>;

/// An artifact an owner (an index merge, a plan step, ...) wants fetched.
#[derive(Debug, Clone)]
pub struct Item {
    pub uri: String,
    /// Alternate URIs to try, in order, on failure (mirror fallover).
    pub alt_uris: Vec<String>,
    pub destination: PathBuf,
    pub expected_hashes: ExpectedHashes,
    pub expected_size: Option<u64>,
    pub status: ItemStatus,
    pub fail_reason: Option<FailReason>,
    /// Chained-fetch counter (`spec.md` §4.5): e.g. a Release file that
    /// still has `Packages` files pending under it.
    pub expected_additional_items: u32,
    /// True if every owner of this queue entry requires verified hashes
    /// (`spec.md`'s `HashesRequired`).
    pub hashes_required: bool,
}

impl Item {
    #[must_use]
    pub fn new(uri: impl Into<String>, destination: PathBuf) -> Self {
        Self {
            uri: uri.into(),
            alt_uris: Vec::new(),
            destination,
            expected_hashes: ExpectedHashes::new(),
            expected_size: None,
            status: ItemStatus::Idle,
            fail_reason: None,
            expected_additional_items: 0,
            hashes_required: false,
        }
    }

    /// Consume the next alternate URI, failing over to it (`spec.md`'s
    /// fail-fallover rule). Returns `false` if no alternates remain.
    pub fn fail_over(&mut self) -> bool {
        if self.alt_uris.is_empty() {
            return false;
        }
        self.uri = self.alt_uris.remove(0);
        self.status = ItemStatus::Idle;
        self.fail_reason = None;
        true
    }

    /// Merge another owner's expected hashes into this item's
    /// (`spec.md`'s hash-merging-across-owners rule): identical algorithms
    /// must agree, or the whole set is cleared and re-verification falls
    /// to each owner individually once the file arrives.
    pub fn merge_hashes(&mut self, other: &ExpectedHashes) {
        if self.expected_hashes.is_empty() {
            self.expected_hashes = other.clone();
            return;
        }
        let mut disagreement = false;
        for (algo, value) in other {
            match self.expected_hashes.get(algo) {
                Some(existing) if existing != value => disagreement = true,
                Some(_) => {}
                None => {
                    self.expected_hashes.insert(algo.clone(), value.clone());
                }
            }
        }
        if disagreement {
            self.expected_hashes.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_over_consumes_next_alt_uri() {
        let mut item = Item::new("http://mirror-a/pkg.deb", PathBuf::from("/tmp/pkg.deb"));
        item.alt_uris.push("http://mirror-b/pkg.deb".to_owned());
        item.status = ItemStatus::Error;
        assert!(item.fail_over());
        assert_eq!(item.uri, "http://mirror-b/pkg.deb");
        assert_eq!(item.status, ItemStatus::Idle);
    }

    #[test]
    fn fail_over_returns_false_when_exhausted() {
        let mut item = Item::new("http://mirror-a/pkg.deb", PathBuf::from("/tmp/pkg.deb"));
        assert!(!item.fail_over());
    }

    #[test]
    fn merging_agreeing_hashes_keeps_both_algorithms() {
        let mut item = Item::new("http://x/Packages.gz", PathBuf::from("/tmp/Packages.gz"));
        item.merge_hashes(&BTreeMap::from([("SHA256".to_owned(), "abc".to_owned())]));
        item.merge_hashes(&BTreeMap::from([("SHA1".to_owned(), "def".to_owned())]));
        assert_eq!(item.expected_hashes.len(), 2);
    }

    #[test]
    fn merging_disagreeing_hashes_clears_all() {
        let mut item = Item::new("http://x/Packages.gz", PathBuf::from("/tmp/Packages.gz"));
        item.merge_hashes(&BTreeMap::from([("SHA256".to_owned(), "abc".to_owned())]));
        item.merge_hashes(&BTreeMap::from([("SHA256".to_owned(), "different".to_owned())]));
        assert!(item.expected_hashes.is_empty());
    }
}
