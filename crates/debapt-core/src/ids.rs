//! Typed entity ids.
//!
//! The original apt stores packed structs inside one growable mmap and
//! refers to other entities through raw pointers into that map; when the
//! map moves (grows) every live pointer needs rebasing. We sidestep that
//! entirely per the redesign note in `spec.md` §9: every reference is a
//! small `u32` id into a side-table owned by `debapt_cache::Cache`, and
//! dereferencing always goes back through the cache handle. Ids are never
//! dangling because they're just indices, not addresses.

use std::num::NonZeroU32;

macro_rules! entity_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Build an id from a raw index. Callers own the invariant that
            /// the index is in bounds for the table it indexes.
            #[must_use]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// The raw index backing this id.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }

        impl From<$name> for u32 {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

entity_id!(GrpId, "Id of a Group (package name) in the package cache.");
entity_id!(PkgId, "Id of a Package (name, architecture) pair.");
entity_id!(VerId, "Id of a Version, a candidate install object.");
entity_id!(DepId, "Id of a single Dependency record.");
entity_id!(PkgFileId, "Id of a Package file descriptor.");
entity_id!(RlsFileId, "Id of a Release file descriptor.");
entity_id!(DescId, "Id of a shared Description (per-language, md5-keyed).");

/// A stable offset into the string arena. Equal strings share one offset.
///
/// Zero is never a valid live offset (`spec.md` §3's "string offsets are
/// never zero for live strings" invariant), so we use `NonZeroU32` to make
/// the sentinel unrepresentable rather than checked at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct StrId(NonZeroU32);

impl StrId {
    /// Construct a `StrId` from a nonzero raw offset.
    #[must_use]
    pub const fn new(offset: NonZeroU32) -> Self {
        Self(offset)
    }

    /// The raw byte offset into the arena's backing buffer.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0.get()
    }
}

/// An optional `StrId`: `None` is the "none" sentinel (offset zero),
/// `Some` wraps a live interned string. Stored as a plain `u32` so it can
/// live inside `#[repr(C)]`/`Pod` cache records, where `Option<StrId>`
/// itself isn't niche-optimizable across an mmap boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct OptStrId(u32);

impl OptStrId {
    /// The "none" sentinel.
    pub const NONE: Self = Self(0);

    /// Wrap a live `StrId`.
    #[must_use]
    pub const fn some(id: StrId) -> Self {
        Self(id.0.get())
    }

    /// Resolve to `Some(StrId)` unless this is the sentinel.
    #[must_use]
    pub fn get(self) -> Option<StrId> {
        NonZeroU32::new(self.0).map(StrId)
    }
}

// SAFETY: `OptStrId` is a transparent `u32` wrapper with no padding and no
// invalid bit patterns -- every `u32` value is a legal `OptStrId` (zero is
// the sentinel, nonzero is a string offset).
unsafe impl bytemuck::Zeroable for OptStrId {}
unsafe impl bytemuck::Pod for OptStrId {}
