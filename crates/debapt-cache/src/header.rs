//! The on-disk cache image header (`spec.md` §6): a fixed-size `Pod`
//! struct whose magic/version/layout signature lets `image::open` decide
//! in one read whether the mapped file is usable or must be rebuilt.

use bytemuck::{Pod, Zeroable};

/// Bumped whenever `entities.rs`'s struct layouts change incompatibly.
pub const LAYOUT_VERSION: u32 = 1;
pub const MAGIC: u32 = 0x4150_5421; // "APT!" swapped to read naturally in a hex dump

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Header {
    pub magic: u32,
    pub layout_version: u32,
    /// Offset into the mixed string pool for the native architecture.
    pub native_arch: u32,
    /// Offset into the mixed string pool for the comma-joined declared
    /// architectures list.
    pub declared_archs: u32,
    pub group_count: u32,
    pub package_count: u32,
    pub version_count: u32,
    pub dependency_count: u32,
    pub provides_count: u32,
    pub release_file_count: u32,
    pub package_file_count: u32,
    pub description_count: u32,
    pub ver_file_count: u32,
    pub desc_file_count: u32,
    pub group_hash_size: u32,
    pub package_hash_size: u32,
    /// Byte length of each string arena's snapshot, in write order
    /// (package-name, version-number, section, mixed), so a reader can
    /// slice the tail of the image without re-parsing it.
    pub pkgname_arena_len: u32,
    pub version_arena_len: u32,
    pub section_arena_len: u32,
    pub mixed_arena_len: u32,
    /// Unix timestamp this image was built, compared against the sources
    /// list's mtime to decide whether a rebuild is due.
    pub built_at: i64,
    /// Set while writing, cleared just before the image is remapped
    /// read-only; a cache opened with this set is known-truncated and is
    /// rebuilt unconditionally.
    pub dirty: u8,
    pub _pad: [u8; 7],
    /// `blake3` digest over every pool's bytes, checked on open so a
    /// bit-flipped cache is detected even if the header round-tripped
    /// cleanly.
    pub content_hash: [u8; 32],
}

impl Header {
    /// True if `self` can be used as-is: right magic, right layout
    /// version, and not left mid-write.
    #[must_use]
    pub fn is_valid(&self, expected_content_hash: &[u8; 32]) -> bool {
        self.magic == MAGIC
            && self.layout_version == LAYOUT_VERSION
            && self.dirty == 0
            && &self.content_hash == expected_content_hash
    }
}
