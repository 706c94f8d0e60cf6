//! Atomic image write and mmap read-open, grounded in `spec.md` §4.1's
//! "Atomic write" and §6's "On-disk cache image" layout: the header,
//! followed by one fixed-size array per entity pool, followed by the four
//! string arenas.
//!
//! Writing goes to `<path>.new`, is `fsync`'d, then renamed over the
//! production path — the same atomic-swap idiom the teacher's tiered
//! cache used for its index file.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use debapt_core::{Error, Result};
use memmap2::Mmap;

use crate::entities::{Dependency, Description, DescFile, Group, Package, PackageFile, Provides, ReleaseFile, Version, VerFile};
use crate::gen::CacheGenerator;
use crate::header::{Header, LAYOUT_VERSION, MAGIC};

/// Number of distinct pool regions after the header, in write/read order.
const POOL_COUNT: usize = 9;

fn pool_bytes<T: bytemuck::Pod>(pool: &crate::pool::Pool<T>) -> &[u8] {
    bytemuck::cast_slice(pool.as_slice())
}

/// Serialize a generator's in-memory state to a single byte buffer laid
/// out as: `Header`, then each entity pool, then the four string arenas,
/// in a fixed order recorded in the header's counts.
pub fn serialize(gen: &CacheGenerator, built_at: i64) -> Vec<u8> {
    let pools: [&[u8]; POOL_COUNT] = [
        pool_bytes(&gen.groups),
        pool_bytes(&gen.packages),
        pool_bytes(&gen.versions),
        pool_bytes(&gen.dependencies),
        pool_bytes(&gen.provides),
        pool_bytes(&gen.release_files),
        pool_bytes(&gen.package_files),
        pool_bytes(&gen.ver_files),
        pool_bytes(&gen.descriptions),
    ];

    let mut body = Vec::new();
    body.extend_from_slice(bytemuck::cast_slice(gen.group_hash.buckets()));
    body.extend_from_slice(bytemuck::cast_slice(gen.package_hash.buckets()));
    for p in pools {
        body.extend_from_slice(p);
    }
    body.extend_from_slice(bytemuck::cast_slice(gen.desc_files.as_slice()));
    body.extend_from_slice(&gen.pkgname_arena.snapshot());
    body.extend_from_slice(&gen.version_arena.snapshot());
    body.extend_from_slice(&gen.section_arena.snapshot());
    body.extend_from_slice(&gen.mixed_arena.snapshot());

    let content_hash: [u8; 32] = blake3::hash(&body).into();

    let header = Header {
        magic: MAGIC,
        layout_version: LAYOUT_VERSION,
        native_arch: 0,
        declared_archs: 0,
        group_count: gen.groups.len() as u32,
        package_count: gen.packages.len() as u32,
        version_count: gen.versions.len() as u32,
        dependency_count: gen.dependencies.len() as u32,
        provides_count: gen.provides.len() as u32,
        release_file_count: gen.release_files.len() as u32,
        package_file_count: gen.package_files.len() as u32,
        description_count: gen.descriptions.len() as u32,
        ver_file_count: gen.ver_files.len() as u32,
        desc_file_count: gen.desc_files.len() as u32,
        group_hash_size: gen.group_hash.len() as u32,
        package_hash_size: gen.package_hash.len() as u32,
        pkgname_arena_len: gen.pkgname_arena.byte_len() as u32,
        version_arena_len: gen.version_arena.byte_len() as u32,
        section_arena_len: gen.section_arena.byte_len() as u32,
        mixed_arena_len: gen.mixed_arena.byte_len() as u32,
        built_at,
        dirty: 0,
        _pad: [0; 7],
        content_hash,
    };

    let mut out = Vec::with_capacity(std::mem::size_of::<Header>() + body.len());
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(&body);
    out
}

/// Write `bytes` to `path` atomically: write to `path.new`, `fsync`,
/// `rename` over `path` (`spec.md` §4.1).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("new");
    let mut file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
    file.write_all(bytes).map_err(|e| Error::io(&tmp_path, e))?;
    file.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// A read-only mmap'd cache image, sliced back out into typed pool views.
pub struct Image {
    mmap: Mmap,
}

impl Image {
    /// Map `path` and validate its header. Returns `Ok(None)` rather than
    /// an error when the file doesn't parse as a valid image, matching
    /// `spec.md` §4.1's "cache with non-matching signature is deleted and
    /// rebuilt" -- the caller decides to regenerate rather than treating
    /// it as fatal.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        // SAFETY: the file is only ever mutated by `write_atomic`'s
        // write-then-rename, so a concurrent writer never mutates this
        // mapping's backing bytes in place.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(path, e))?;
        if mmap.len() < std::mem::size_of::<Header>() {
            return Ok(None);
        }
        let header: &Header = bytemuck::from_bytes(&mmap[..std::mem::size_of::<Header>()]);
        let body = &mmap[std::mem::size_of::<Header>()..];
        let content_hash: [u8; 32] = blake3::hash(body).into();
        if !header.is_valid(&content_hash) {
            return Ok(None);
        }
        Ok(Some(Self { mmap }))
    }

    fn header(&self) -> &Header {
        bytemuck::from_bytes(&self.mmap[..std::mem::size_of::<Header>()])
    }

    fn region<T: bytemuck::Pod>(&self, offset: usize, count: usize) -> (&[T], usize) {
        let bytes = count * std::mem::size_of::<T>();
        let slice = bytemuck::cast_slice(&self.mmap[offset..offset + bytes]);
        (slice, offset + bytes)
    }

    /// The group/package hash-chain head tables, in write order.
    #[must_use]
    pub fn hash_tables(&self) -> (crate::hashtable::HashTable, crate::hashtable::HashTable) {
        let h = self.header();
        let off = std::mem::size_of::<Header>();
        let (group_buckets, off) = self.region::<u32>(off, h.group_hash_size as usize);
        let (package_buckets, _) = self.region::<u32>(off, h.package_hash_size as usize);
        (
            crate::hashtable::HashTable::from_buckets(group_buckets),
            crate::hashtable::HashTable::from_buckets(package_buckets),
        )
    }

    fn pools_start(&self) -> usize {
        let h = self.header();
        std::mem::size_of::<Header>()
            + h.group_hash_size as usize * std::mem::size_of::<u32>()
            + h.package_hash_size as usize * std::mem::size_of::<u32>()
    }

    /// Slice out every typed pool in write order, plus the byte offset
    /// where the four string arenas begin.
    #[must_use]
    pub fn pools(
        &self,
    ) -> (
        &[Group],
        &[Package],
        &[Version],
        &[Dependency],
        &[Provides],
        &[ReleaseFile],
        &[PackageFile],
        &[VerFile],
        &[Description],
        &[DescFile],
    ) {
        let h = self.header();
        let mut off = self.pools_start();
        let (groups, n) = self.region::<Group>(off, h.group_count as usize + 1);
        off = n;
        let (packages, n) = self.region::<Package>(off, h.package_count as usize + 1);
        off = n;
        let (versions, n) = self.region::<Version>(off, h.version_count as usize + 1);
        off = n;
        let (deps, n) = self.region::<Dependency>(off, h.dependency_count as usize + 1);
        off = n;
        let (provides, n) = self.region::<Provides>(off, h.provides_count as usize + 1);
        off = n;
        let (release_files, n) = self.region::<ReleaseFile>(off, h.release_file_count as usize + 1);
        off = n;
        let (package_files, n) = self.region::<PackageFile>(off, h.package_file_count as usize + 1);
        off = n;
        let (ver_files, n) = self.region::<VerFile>(off, h.ver_file_count as usize + 1);
        off = n;
        let (descriptions, n) = self.region::<Description>(off, h.description_count as usize + 1);
        off = n;
        let (desc_files, _) = self.region::<DescFile>(off, h.desc_file_count as usize + 1);
        (groups, packages, versions, deps, provides, release_files, package_files, ver_files, descriptions, desc_files)
    }

    /// End offset of the typed-pool region, i.e. where the four string
    /// arena snapshots begin.
    fn pools_end(&self) -> usize {
        let h = self.header();
        self.pools_start()
            + (h.group_count as usize + 1) * std::mem::size_of::<Group>()
            + (h.package_count as usize + 1) * std::mem::size_of::<Package>()
            + (h.version_count as usize + 1) * std::mem::size_of::<Version>()
            + (h.dependency_count as usize + 1) * std::mem::size_of::<Dependency>()
            + (h.provides_count as usize + 1) * std::mem::size_of::<Provides>()
            + (h.release_file_count as usize + 1) * std::mem::size_of::<ReleaseFile>()
            + (h.package_file_count as usize + 1) * std::mem::size_of::<PackageFile>()
            + (h.ver_file_count as usize + 1) * std::mem::size_of::<VerFile>()
            + (h.description_count as usize + 1) * std::mem::size_of::<Description>()
            + (h.desc_file_count as usize + 1) * std::mem::size_of::<DescFile>()
    }

    /// The four string arena byte regions, in write order: package-name,
    /// version-number, section, mixed.
    #[must_use]
    pub fn arenas(&self) -> (&[u8], &[u8], &[u8], &[u8]) {
        let h = self.header();
        let mut off = self.pools_end();
        let pkgname = &self.mmap[off..off + h.pkgname_arena_len as usize];
        off += h.pkgname_arena_len as usize;
        let version = &self.mmap[off..off + h.version_arena_len as usize];
        off += h.version_arena_len as usize;
        let section = &self.mmap[off..off + h.section_arena_len as usize];
        off += h.section_arena_len as usize;
        let mixed = &self.mmap[off..off + h.mixed_arena_len as usize];
        (pkgname, version, section, mixed)
    }

    #[must_use]
    pub fn header_ref(&self) -> &Header {
        self.header()
    }
}

/// Read a length-prefixed string out of a raw arena byte snapshot, matching
/// the format `debapt_core::StringArena` writes (`spec.md` §6).
#[must_use]
pub fn read_str_at(bytes: &[u8], offset: u32) -> &str {
    let start = offset as usize;
    let len = u32::from_le_bytes(bytes[start..start + 4].try_into().expect("length prefix is 4 bytes")) as usize;
    std::str::from_utf8(&bytes[start + 4..start + 4 + len]).expect("arena only ever stores valid utf8")
}
