//! Packed, `bytemuck::Pod` entity records, one array per kind, indexed by
//! the typed ids from `debapt_core::ids`. These are exactly what gets
//! written into the mmap image (`spec.md` §3, §6): no pointers, only `u32`
//! indices into sibling pools, so a generation's data is valid regardless
//! of where the backing file is mapped.
//!
//! A `0` index means "no link" everywhere except the handful of fields
//! that are themselves ids into a 1-based pool (those use `0` the same
//! way, since pool slot 0 is never allocated — see `pool::Pool::new`).

use bytemuck::{Pod, Zeroable};

/// A small `u8`-backed bitflags type, in the spirit of the teacher's
/// hand-rolled bit-twiddling modules (see `bloom.rs`) but generated once
/// per flag set instead of copy-pasted.
macro_rules! bitflags_u8 {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: u8 {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
        pub struct $name(pub u8);

        impl $name {
            $(pub const $variant: Self = Self($value);)*

            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }
        }
    };
}

/// A package name, and the closed set of its per-architecture packages.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Group {
    /// Offset into the package-name string pool.
    pub name: u32,
    /// First `Package` in this group's per-arch list, 0 if none yet.
    pub first_package: u32,
    /// Last `Package`, so appending a new arch is O(1).
    pub last_package: u32,
    /// Next `Group` in this name's hash bucket.
    pub hash_next: u32,
    pub id: u32,
}

bitflags_u8! {
    /// Per-package flags (`spec.md` §3's Package attributes, apt's
    /// `pkgCache::Flag` subset that applies at the package rather than
    /// version level).
    pub struct PkgFlags: u8 {
        const ESSENTIAL = 0b0000_0001;
        const IMPORTANT = 0b0000_0010;
    }
}

/// A (name, architecture) pair. May have zero versions (purely virtual).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Package {
    /// Owning `Group`.
    pub group: u32,
    /// Offset into the mixed string pool.
    pub arch: u32,
    /// Head of this package's version list, descending-version order, 0 if none.
    pub version_list: u32,
    /// Version currently installed according to the status file, 0 if none.
    pub current_version: u32,
    /// Next `Package` in the group's per-arch list.
    pub group_next: u32,
    /// Next `Package` in this name's hash bucket (chained on group name).
    pub hash_next: u32,
    /// Head of the reverse-depends chain: `Dependency` records whose
    /// target is this package.
    pub rev_depends: u32,
    /// Head of the reverse-provides chain: `Provides` records whose
    /// target is this package.
    pub rev_provides: u32,
    pub flags: u8,
    pub _pad: [u8; 3],
    pub id: u32,
}

/// `Version::MultiArch`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiArch {
    None = 0,
    Same = 1,
    Foreign = 2,
    Allowed = 3,
}

impl MultiArch {
    #[must_use]
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Same,
            2 => Self::Foreign,
            3 => Self::Allowed,
            _ => Self::None,
        }
    }
}

/// Package priority, highest first (`required` is most important).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Unknown = 0,
    Extra = 1,
    Optional = 2,
    Standard = 3,
    Important = 4,
    Required = 5,
}

/// A candidate install object.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Version {
    /// Offset into the version-number string pool.
    pub ver_str: u32,
    /// Offset into the mixed string pool, 0 if same as the binary package name.
    pub source_package: u32,
    /// Offset into the version-number string pool, 0 if same as `ver_str`.
    pub source_version: u32,
    /// Offset into the mixed string pool ("section"), 0 if unset.
    pub section: u32,
    pub installed_size: u64,
    pub download_size: u64,
    /// `blake3` hash of this version's control stanza, used for the
    /// `SameVersion` de-duplication check during cache generation.
    pub control_hash: [u8; 32],
    /// Owning `Package`.
    pub parent_package: u32,
    /// Next `Version` in the package's descending-version-order list.
    pub next_in_package: u32,
    /// Head of this version's `Dependency` list.
    pub depends: u32,
    /// Head of this version's `Provides` list (provides *from* this version).
    pub provides: u32,
    /// Head of this version's `VerFile` list (which `PackageFile`s carry it).
    pub files: u32,
    /// Shared `Description`, 0 if none parsed yet.
    pub description: u32,
    pub priority: u8,
    pub multi_arch: u8,
    pub _pad: [u8; 2],
    pub id: u32,
}

bitflags_u8! {
    pub struct DepKind: u8 {
        const DEPENDS = 0;
        const PRE_DEPENDS = 1;
        const RECOMMENDS = 2;
        const SUGGESTS = 3;
        const ENHANCES = 4;
        const CONFLICTS = 5;
        const BREAKS = 6;
        const REPLACES = 7;
        const OBSOLETES = 8;
    }
}

impl DepKind {
    /// Critical kinds per `spec.md` §3: these participate in
    /// install-broken computation unconditionally.
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(self.0, 0 | 1 | 5 | 6)
    }

    /// Negative kinds: satisfied by *absence* of the target, not presence.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self.0, 5 | 6 | 8)
    }
}

/// A version-constraint comparison operator.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    None = 0,
    LessEq = 1,
    GreaterEq = 2,
    Less = 3,
    Greater = 4,
    Equal = 5,
    NotEqual = 6,
}

impl CompareOp {
    #[must_use]
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::LessEq,
            2 => Self::GreaterEq,
            3 => Self::Less,
            4 => Self::Greater,
            5 => Self::Equal,
            6 => Self::NotEqual,
            _ => Self::None,
        }
    }

    /// Evaluate `lhs <op> rhs` using Debian version ordering.
    #[must_use]
    pub fn eval(self, lhs: &deb::version::Version, rhs: &deb::version::Version) -> bool {
        use std::cmp::Ordering;
        let ord = lhs.cmp(rhs);
        match self {
            Self::None => true,
            Self::LessEq => ord != Ordering::Greater,
            Self::GreaterEq => ord != Ordering::Less,
            Self::Less => ord == Ordering::Less,
            Self::Greater => ord == Ordering::Greater,
            Self::Equal => ord == Ordering::Equal,
            Self::NotEqual => ord != Ordering::Equal,
        }
    }
}

/// One dependency record. OR-groups are consecutive records sharing
/// `or_group = true` on all but the last (`spec.md` §3).
///
/// We intentionally skip the original's separate `DependencyData`
/// indirection (deduplicating identical `(target, constraint, kind)`
/// tuples across versions) — it's a memory-footprint optimization
/// orthogonal to dependency-resolution correctness, and storing the tuple
/// inline keeps this struct self-contained. See `DESIGN.md`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Dependency {
    pub parent_version: u32,
    pub target_package: u32,
    /// Offset into the version-number string pool, 0 if unconstrained.
    pub version_constraint: u32,
    pub compare_op: u8,
    pub kind: u8,
    pub or_group: u8,
    pub _pad: u8,
    /// Next `Dependency` for the same parent version.
    pub next_in_version: u32,
    /// Next `Dependency` in the target package's reverse-depends chain.
    pub next_rev_dep: u32,
    pub id: u32,
}

bitflags_u8! {
    pub struct ProvideFlags: u8 {
        const MULTI_ARCH_IMPLICIT = 0b0000_0001;
        const ARCH_SPECIFIC = 0b0000_0010;
    }
}

/// A `(provider version, target package)` edge.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Provides {
    pub version: u32,
    pub target_package: u32,
    /// Offset into the version-number string pool, 0 if none declared.
    pub provide_version: u32,
    pub flags: u8,
    pub _pad: [u8; 3],
    /// Next `Provides` for the same provider version.
    pub next_in_version: u32,
    /// Next `Provides` in the target package's reverse-provides chain.
    pub next_rev_provide: u32,
    pub id: u32,
}

bitflags_u8! {
    pub struct TrustFlags: u8 {
        const NOT_SOURCE = 0b0000_0001;
        const NOT_AUTOMATIC = 0b0000_0010;
        const BUT_AUTOMATIC_UPGRADES = 0b0000_0100;
        const TRUSTED = 0b0000_1000;
    }
}

/// A `Release` file: one per repository/suite the sources list names.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ReleaseFile {
    pub site: u32,
    pub filename: u32,
    pub archive: u32,
    pub codename: u32,
    pub origin: u32,
    pub label: u32,
    pub mtime: i64,
    /// Unix timestamp from `Valid-Until`, 0 if absent.
    pub valid_until: i64,
    pub trust_flags: u8,
    pub _pad: [u8; 3],
    pub id: u32,
}

/// A `Packages`/`Sources`/status-file index file, belonging to one
/// `ReleaseFile` (0 if standalone, e.g. the dpkg status file or a local
/// `.deb`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PackageFile {
    pub filename: u32,
    pub component: u32,
    pub architecture: u32,
    pub release_file: u32,
    pub size: u64,
    pub next: u32,
    pub id: u32,
}

/// One `(version, file)` edge: version `v` is carried by package file `f`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VerFile {
    pub version: u32,
    pub file: u32,
    pub next: u32,
    pub id: u32,
}

/// A description shared across versions with identical md5.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Description {
    /// Offset into the mixed string pool, 0 if unset (implies "en").
    pub language: u32,
    pub md5: [u8; 16],
    pub files: u32,
    pub id: u32,
}

/// A `(description, file)` edge, paralleling `VerFile`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DescFile {
    pub description: u32,
    pub file: u32,
    pub next: u32,
    pub id: u32,
}

