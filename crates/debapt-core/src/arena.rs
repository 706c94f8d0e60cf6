//! Interned strings backed by a single append-only byte arena.
//!
//! `spec.md` §3 calls for four independent pools (mixed, package-name,
//! version-number, section) so that names clustered by kind stay close in
//! memory and so a cache rebuild can re-derive stable layout per pool. Each
//! pool is its own `StringArena`; `StringPool` just names which one a
//! caller wants.

use crate::ids::StrId;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::num::NonZeroU32;

/// Which of the four interning pools a string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringPool {
    /// Everything that doesn't fit the other three: descriptions, sites,
    /// archive/component/label strings, file paths.
    Mixed,
    /// Package and group names.
    PackageName,
    /// Version strings.
    VersionNumber,
    /// Section strings ("admin", "net", ...).
    Section,
}

/// A single append-only string arena with a hash table in front of it so
/// equal strings collapse to one offset.
///
/// Byte zero of the backing buffer is never handed out as a live offset --
/// callers see offsets starting at 1, which lets `StrId` use `NonZeroU32`
/// and makes the "none" sentinel from `spec.md` §3 unrepresentable rather
/// than checked.
#[derive(Debug, Default)]
pub struct StringArena {
    inner: RwLock<ArenaInner>,
}

#[derive(Debug, Default)]
struct ArenaInner {
    bytes: Vec<u8>,
    offsets: AHashMap<Box<str>, StrId>,
}

impl StringArena {
    /// Create an empty arena. The first byte is reserved so offset 0 stays
    /// the "none" sentinel and never collides with a live string.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = Vec::with_capacity(4096);
        bytes.push(0); // reserve offset 0
        Self {
            inner: RwLock::new(ArenaInner { bytes, offsets: AHashMap::new() }),
        }
    }

    /// Intern `s`, returning the existing id if this exact string was
    /// already interned, or appending it and returning a fresh one.
    pub fn intern(&self, s: &str) -> StrId {
        if let Some(id) = self.inner.read().offsets.get(s) {
            return *id;
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have interned
        // the same string while we were waiting.
        if let Some(id) = inner.offsets.get(s) {
            return *id;
        }
        let offset = inner.bytes.len() as u32;
        // SAFETY of the unwrap: `offset` is always >= 1 because byte 0 is
        // reserved by `new`, so it's always a valid NonZeroU32.
        let id = StrId::new(NonZeroU32::new(offset).expect("offset 0 is reserved"));
        // Store "<u32 len><bytes>" so resolution doesn't need a second
        // table; len-prefixing also makes the image format in spec.md §6
        // self-describing without a separate string-table index.
        let len = s.len() as u32;
        inner.bytes.extend_from_slice(&len.to_le_bytes());
        inner.bytes.extend_from_slice(s.as_bytes());
        inner.offsets.insert(s.into(), id);
        id
    }

    /// Resolve an id back to its string. Panics if `id` was not produced by
    /// this arena -- ids from different pools/arenas are never
    /// interchangeable, matching the "four pools" invariant.
    #[must_use]
    pub fn resolve(&self, id: StrId) -> String {
        let inner = self.inner.read();
        let start = id.offset() as usize;
        let len = u32::from_le_bytes(
            inner.bytes[start..start + 4].try_into().expect("length prefix is 4 bytes"),
        ) as usize;
        let data = &inner.bytes[start + 4..start + 4 + len];
        std::str::from_utf8(data).expect("arena only ever stores valid utf8").to_owned()
    }

    /// Total bytes resident in the arena, including length prefixes. Used
    /// by the cache generator to size the on-disk string region.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.inner.read().bytes.len()
    }

    /// Copy of the raw backing bytes, for writing the on-disk image.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.read().bytes.clone()
    }

    /// Number of distinct strings interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().offsets.len()
    }

    /// Whether any strings have been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_share_one_offset() {
        let arena = StringArena::new();
        let a = arena.intern("libc6");
        let b = arena.intern("libc6");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_offsets() {
        let arena = StringArena::new();
        let a = arena.intern("libc6");
        let b = arena.intern("libc6-dev");
        assert_ne!(a, b);
    }

    #[test]
    fn offsets_never_zero() {
        let arena = StringArena::new();
        let id = arena.intern("");
        assert_ne!(id.offset(), 0);
    }

    #[test]
    fn round_trips() {
        let arena = StringArena::new();
        let id = arena.intern("amd64");
        assert_eq!(arena.resolve(id), "amd64");
    }
}
