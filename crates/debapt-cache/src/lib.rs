//! The binary package cache: an mmap-backed, content-addressed,
//! string-interned index over every package/version/dependency record
//! known from the configured sources, status file, and local `.deb`s.
//!
//! [`gen::CacheGenerator`] builds the structure purely in memory ("build
//! first"); [`image`] serializes it to a single file and, on the read
//! path, maps that file back in without ever touching the heap for the
//! bulk data. [`Cache`] is the public read handle callers actually use.

#![allow(unsafe_code)] // required for memmap2

pub mod entities;
pub mod gen;
pub mod hashtable;
pub mod header;
pub mod image;
pub mod pool;

use std::path::Path;

use debapt_core::ids::{DepId, DescId, GrpId, PkgFileId, PkgId, RlsFileId, VerId};
use debapt_core::{Error, Result};

pub use entities::{
    CompareOp, DepKind, Dependency, DescFile, Description, Group, MultiArch, Package,
    PackageFile, PkgFlags, Priority, ProvideFlags, Provides, ReleaseFile, TrustFlags, VerFile,
    Version,
};
pub use gen::{CacheGenerator, DependencyRequest, ProvidesRequest};
pub use header::Header;
pub use image::Image;

/// A read-only handle onto a built cache image.
///
/// Every lookup goes through typed ids (`GrpId`, `PkgId`, ...) rather than
/// raw indices so a caller can't accidentally use a `PkgId` to index the
/// version pool (`spec.md` §9's redesign note on the original's bare
/// pointers).
pub struct Cache {
    image: Image,
    group_hash: hashtable::HashTable,
    package_hash: hashtable::HashTable,
}

impl Cache {
    /// Map an existing image file. Returns `Ok(None)` if the file is
    /// missing, truncated, or fails its header/content-hash check -- the
    /// caller is expected to fall back to [`Self::build`].
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let Some(image) = Image::open(path)? else {
            return Ok(None);
        };
        let (group_hash, package_hash) = image.hash_tables();
        Ok(Some(Self { image, group_hash, package_hash }))
    }

    /// Serialize `gen`'s in-memory state, write it atomically to `path`,
    /// then map it back in. This is the only way a [`Cache`] is produced
    /// from a fresh generation -- the generator itself is never queried
    /// directly, matching `spec.md` §9's "only the finished image is
    /// mapped for reads".
    pub fn build(gen: &CacheGenerator, path: &Path, built_at: i64) -> Result<Self> {
        let bytes = image::serialize(gen, built_at);
        image::write_atomic(path, &bytes)?;
        Self::open(path)?.ok_or_else(|| {
            Error::CorruptCache(format!(
                "{} failed to validate immediately after being written",
                path.display()
            ))
        })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        self.image.header_ref()
    }

    fn resolve_pkgname(&self, offset: u32) -> &str {
        let (pkgname, ..) = self.image.arenas();
        image::read_str_at(pkgname, offset)
    }

    fn resolve_version_str(&self, offset: u32) -> Option<&str> {
        if offset == 0 {
            return None;
        }
        let (_, version, ..) = self.image.arenas();
        Some(image::read_str_at(version, offset))
    }

    fn resolve_section(&self, offset: u32) -> Option<&str> {
        if offset == 0 {
            return None;
        }
        let (_, _, section, _) = self.image.arenas();
        Some(image::read_str_at(section, offset))
    }

    fn resolve_mixed(&self, offset: u32) -> Option<&str> {
        if offset == 0 {
            return None;
        }
        let (.., mixed) = self.image.arenas();
        Some(image::read_str_at(mixed, offset))
    }

    /// Resolve a raw offset into the mixed string pool. Exposed so
    /// collaborator crates can read `ReleaseFile` fields (site, archive,
    /// codename, origin, label) without duplicating the pool dispatch.
    #[must_use]
    pub fn mixed_str(&self, offset: u32) -> Option<&str> {
        self.resolve_mixed(offset)
    }

    #[must_use]
    pub fn group(&self, id: GrpId) -> &Group {
        &self.image.pools().0[id.index()]
    }

    #[must_use]
    pub fn package(&self, id: PkgId) -> &Package {
        &self.image.pools().1[id.index()]
    }

    #[must_use]
    pub fn version(&self, id: VerId) -> &Version {
        &self.image.pools().2[id.index()]
    }

    #[must_use]
    pub fn dependency(&self, id: DepId) -> &Dependency {
        &self.image.pools().3[id.index()]
    }

    #[must_use]
    pub fn provides_record(&self, id: u32) -> &Provides {
        &self.image.pools().4[id as usize]
    }

    #[must_use]
    pub fn release_file(&self, id: RlsFileId) -> &ReleaseFile {
        &self.image.pools().5[id.index()]
    }

    #[must_use]
    pub fn package_file(&self, id: PkgFileId) -> &PackageFile {
        &self.image.pools().6[id.index()]
    }

    #[must_use]
    pub fn description(&self, id: DescId) -> &Description {
        &self.image.pools().8[id.index()]
    }

    #[must_use]
    pub fn group_name(&self, id: GrpId) -> &str {
        self.resolve_pkgname(self.group(id).name)
    }

    #[must_use]
    pub fn package_name(&self, id: PkgId) -> &str {
        self.group_name(GrpId::new(self.package(id).group))
    }

    #[must_use]
    pub fn package_arch(&self, id: PkgId) -> &str {
        self.resolve_mixed(self.package(id).arch).unwrap_or_default()
    }

    #[must_use]
    pub fn version_string(&self, id: VerId) -> &str {
        self.resolve_version_str(self.version(id).ver_str).unwrap_or_default()
    }

    #[must_use]
    pub fn version_section(&self, id: VerId) -> Option<&str> {
        self.resolve_section(self.version(id).section)
    }

    #[must_use]
    pub fn version_priority(&self, id: VerId) -> Priority {
        match self.version(id).priority {
            1 => Priority::Extra,
            2 => Priority::Optional,
            3 => Priority::Standard,
            4 => Priority::Important,
            5 => Priority::Required,
            _ => Priority::Unknown,
        }
    }

    #[must_use]
    pub fn version_multi_arch(&self, id: VerId) -> MultiArch {
        MultiArch::from_u8(self.version(id).multi_arch)
    }

    /// The source package name this version was built from, falling back
    /// to the binary package's own name when the field is unset (same
    /// source and binary name, the common case).
    #[must_use]
    pub fn version_source_package(&self, id: VerId) -> &str {
        let ver = self.version(id);
        self.resolve_mixed(ver.source_package).unwrap_or_else(|| self.package_name(PkgId::new(ver.parent_package)))
    }

    /// The source version this binary version was built from, falling
    /// back to the binary's own version string when unset.
    #[must_use]
    pub fn version_source_version(&self, id: VerId) -> &str {
        let ver = self.version(id);
        self.resolve_version_str(ver.source_version).unwrap_or_else(|| self.version_string(id))
    }

    #[must_use]
    pub fn dependency_constraint(&self, id: DepId) -> Option<(CompareOp, &str)> {
        let dep = self.dependency(id);
        let op = CompareOp::from_u8(dep.compare_op);
        if op == CompareOp::None {
            return None;
        }
        self.resolve_version_str(dep.version_constraint).map(|v| (op, v))
    }

    /// Find a `Group` (package name) by exact, case-insensitive match.
    /// Chains are sorted ascending by case-folded name, so a strictly
    /// greater candidate means the rest of the chain can't match either.
    #[must_use]
    pub fn find_group(&self, name: &str) -> Option<GrpId> {
        let groups = self.image.pools().0;
        let needle = name.to_ascii_lowercase();
        let mut slot = self.group_hash.head(self.group_hash.bucket(name));
        while slot != 0 {
            let g = &groups[slot as usize];
            let candidate = self.resolve_pkgname(g.name).to_ascii_lowercase();
            if candidate == needle {
                return Some(GrpId::new(slot));
            }
            if candidate > needle {
                return None;
            }
            slot = g.hash_next;
        }
        None
    }

    /// Find a `(name, architecture)` package. `arch` must already be
    /// resolved (callers should translate `"all"` to the native
    /// architecture before calling, as [`gen::CacheGenerator::new_package`]
    /// does during generation).
    #[must_use]
    pub fn find_package(&self, name: &str, arch: &str) -> Option<PkgId> {
        let group = self.find_group(name)?;
        let packages = self.image.pools().1;
        let mut slot = self.group(group).first_package;
        while slot != 0 {
            let p = &packages[slot as usize];
            if self.resolve_mixed(p.arch) == Some(arch) {
                return Some(PkgId::new(slot));
            }
            slot = p.group_next;
        }
        None
    }

    /// Every `Package` (one per architecture) in `group`.
    #[must_use]
    pub fn group_packages(&self, group: GrpId) -> Vec<PkgId> {
        let packages = self.image.pools().1;
        let mut out = Vec::new();
        let mut slot = self.group(group).first_package;
        while slot != 0 {
            out.push(PkgId::new(slot));
            slot = packages[slot as usize].group_next;
        }
        out
    }

    /// A package's versions, in descending-version order (as built by
    /// [`gen::CacheGenerator::new_version`]).
    #[must_use]
    pub fn package_versions(&self, pkg: PkgId) -> Vec<VerId> {
        let versions = self.image.pools().2;
        let mut out = Vec::new();
        let mut slot = self.package(pkg).version_list;
        while slot != 0 {
            out.push(VerId::new(slot));
            slot = versions[slot as usize].next_in_package;
        }
        out
    }

    /// A version's own dependency records (forward edges).
    #[must_use]
    pub fn version_depends(&self, ver: VerId) -> Vec<DepId> {
        let deps = self.image.pools().3;
        let mut out = Vec::new();
        let mut slot = self.version(ver).depends;
        while slot != 0 {
            out.push(DepId::new(slot));
            slot = deps[slot as usize].next_in_version;
        }
        out
    }

    /// Dependency records naming `pkg` as their target (reverse edges).
    #[must_use]
    pub fn package_rev_depends(&self, pkg: PkgId) -> Vec<DepId> {
        let deps = self.image.pools().3;
        let mut out = Vec::new();
        let mut slot = self.package(pkg).rev_depends;
        while slot != 0 {
            out.push(DepId::new(slot));
            slot = deps[slot as usize].next_rev_dep;
        }
        out
    }

    /// Provides edges a version declares.
    #[must_use]
    pub fn version_provides(&self, ver: VerId) -> Vec<u32> {
        let provides = self.image.pools().4;
        let mut out = Vec::new();
        let mut slot = self.version(ver).provides;
        while slot != 0 {
            out.push(slot);
            slot = provides[slot as usize].next_in_version;
        }
        out
    }

    /// Package files carrying `ver`, e.g. to check a source's trust flags
    /// via [`Self::package_file`] / [`Self::release_file`].
    #[must_use]
    pub fn version_files(&self, ver: VerId) -> Vec<PkgFileId> {
        let ver_files = self.image.pools().7;
        let mut out = Vec::new();
        let mut slot = self.version(ver).files;
        while slot != 0 {
            out.push(PkgFileId::new(ver_files[slot as usize].file));
            slot = ver_files[slot as usize].next;
        }
        out
    }

    /// The `ReleaseFile` backing `file`, or `None` for a standalone file
    /// (the dpkg status file, a loose `.deb`).
    #[must_use]
    pub fn package_file_release(&self, file: PkgFileId) -> Option<&ReleaseFile> {
        let rls = self.package_file(file).release_file;
        (rls != 0).then(|| self.release_file(RlsFileId::new(rls)))
    }

    /// Provides edges naming `pkg` as their target.
    #[must_use]
    pub fn package_rev_provides(&self, pkg: PkgId) -> Vec<u32> {
        let provides = self.image.pools().4;
        let mut out = Vec::new();
        let mut slot = self.package(pkg).rev_provides;
        while slot != 0 {
            out.push(slot);
            slot = provides[slot as usize].next_rev_provide;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::{CompareOp, DepKind, MultiArch, Priority};
    use gen::DependencyRequest;

    fn build_simple() -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        let libc = gen.new_package("libc6", "amd64");
        gen.new_version(libc, "2.37-1", MultiArch::Same, Priority::Required, Some("libs"), None, None, 2_000_000, 500_000, [1u8; 32]);

        let vim = gen.new_package("vim", "amd64");
        let vim_ver = gen.new_version(vim, "9.0-1", MultiArch::None, Priority::Optional, Some("editors"), None, None, 3_000_000, 900_000, [2u8; 32]);
        gen.new_depends(
            vim_ver,
            &DependencyRequest {
                target_package: "libc6",
                target_arch: None,
                version_constraint: Some((CompareOp::GreaterEq, "2.30")),
                kind: DepKind::DEPENDS,
                or_group: false,
            },
        );

        let path = dir.path().join("cache.bin");
        let cache = Cache::build(&gen, &path, 1_700_000_000).unwrap();
        (dir, cache)
    }

    #[test]
    fn find_group_and_package_round_trip() {
        let (_dir, cache) = build_simple();
        let group = cache.find_group("Vim").expect("case-insensitive lookup");
        assert_eq!(cache.group_name(group), "vim");
        let pkg = cache.find_package("vim", "amd64").unwrap();
        assert_eq!(cache.package_arch(pkg), "amd64");
    }

    #[test]
    fn missing_package_is_none() {
        let (_dir, cache) = build_simple();
        assert!(cache.find_group("nonexistent").is_none());
        assert!(cache.find_package("vim", "arm64").is_none());
    }

    #[test]
    fn version_depends_links_to_target_package() {
        let (_dir, cache) = build_simple();
        let vim = cache.find_package("vim", "amd64").unwrap();
        let ver = cache.package_versions(vim)[0];
        let deps = cache.version_depends(ver);
        assert_eq!(deps.len(), 1);
        let (op, constraint) = cache.dependency_constraint(deps[0]).unwrap();
        assert_eq!(op, CompareOp::GreaterEq);
        assert_eq!(constraint, "2.30");

        let libc = cache.find_package("libc6", "amd64").unwrap();
        let rev = cache.package_rev_depends(libc);
        assert_eq!(rev, deps);
    }

    #[test]
    fn reopen_after_build_reuses_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        let pkg = gen.new_package("hello", "amd64");
        gen.new_version(pkg, "2.10-1", MultiArch::None, Priority::Optional, None, None, None, 100, 50, [0u8; 32]);
        let path = dir.path().join("cache.bin");
        Cache::build(&gen, &path, 0).unwrap();

        let reopened = Cache::open(&path).unwrap().expect("valid image reopens");
        assert!(reopened.find_package("hello", "amd64").is_some());
    }
}
