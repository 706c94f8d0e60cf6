//! The solver's own provider comparator: `spec.md` §4.2's 8-step
//! tie-break (shared in spirit with `debapt_depcache::overlay`'s greedy
//! comparator) plus the solver-specific preference for a non-obsolete
//! candidate when choosing among upgrade targets.
//!
//! `apt-pkg/solver3.cc` keeps its own `CompareProviders3` rather than
//! reusing `pkgDepCache::CompareProviders` because the solver additionally
//! cares about obsolescence and about which alternative is already under
//! consideration by an open choice point; we mirror that split here
//! instead of routing through `debapt_depcache::DepCache::compare_providers`.

use std::cmp::Reverse;

use debapt_cache::{Cache, MultiArch, PkgFlags};
use debapt_core::ids::{GrpId, PkgId, VerId};

use crate::version::is_obsolete;

/// Tie-break order (greater wins): (a) sibling installed under
/// multi-arch=same, (b) currently installed, (c) in the dependency
/// target's own group, (d) not obsolete, (e) essential, (f) important,
/// (g) architecture rank, (h) priority, (i) lower internal id.
type Rank = (bool, bool, bool, bool, bool, bool, usize, u8, Reverse<u32>);

pub struct ProviderComparator<'c> {
    cache: &'c Cache,
    native_arch: String,
    declared_archs: Vec<String>,
}

impl<'c> ProviderComparator<'c> {
    #[must_use]
    pub fn new(cache: &'c Cache) -> Self {
        let native_arch = cache.mixed_str(cache.header().native_arch).unwrap_or_default().to_owned();
        let declared_archs = cache
            .mixed_str(cache.header().declared_archs)
            .map(|s| s.split(',').map(str::to_owned).collect())
            .unwrap_or_default();
        Self { cache, native_arch, declared_archs }
    }

    /// Sort `candidates` best-first for satisfying a dependency targeting
    /// `dep_target`.
    pub fn sort_best_first(&self, dep_target: PkgId, candidates: &mut [VerId]) {
        candidates.sort_by_key(|&v| Reverse(self.rank(dep_target, v)));
    }

    fn rank(&self, dep_target: PkgId, ver: VerId) -> Rank {
        let version = *self.cache.version(ver);
        let pkg = PkgId::new(version.parent_package);
        let pkg_rec = *self.cache.package(pkg);

        let sibling_installed = self.cache.version_multi_arch(ver) == MultiArch::Same
            && self
                .cache
                .group_packages(GrpId::new(pkg_rec.group))
                .into_iter()
                .any(|sib| sib != pkg && self.cache.package(sib).current_version != 0);
        let currently_installed = pkg_rec.current_version == ver.0;
        let in_target_group = pkg_rec.group == self.cache.package(dep_target).group;
        let not_obsolete = !is_obsolete(self.cache, ver);
        let essential = PkgFlags(pkg_rec.flags).contains(PkgFlags::ESSENTIAL);
        let important = PkgFlags(pkg_rec.flags).contains(PkgFlags::IMPORTANT);
        let arch_rank = self.arch_rank(self.cache.package_arch(pkg));
        let priority = version.priority;

        (
            sibling_installed,
            currently_installed,
            in_target_group,
            not_obsolete,
            essential,
            important,
            arch_rank,
            priority,
            Reverse(ver.0),
        )
    }

    fn arch_rank(&self, arch: &str) -> usize {
        if arch == self.native_arch {
            return self.declared_archs.len() + 1;
        }
        self.declared_archs.iter().position(|a| a == arch).map_or(0, |i| self.declared_archs.len() - i)
    }
}

#[cfg(test)]
mod tests {
    use debapt_cache::{CacheGenerator, Priority};

    use super::*;

    fn two_arches() -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned(), "i386".to_owned()]);
        let native = gen.new_package("libfoo", "amd64");
        gen.new_version(native, "1.0-1", MultiArch::Same, Priority::Optional, None, None, None, 1, 1, [1u8; 32]);
        let foreign = gen.new_package("libfoo", "i386");
        gen.new_version(foreign, "1.0-1", MultiArch::Same, Priority::Optional, None, None, None, 1, 1, [2u8; 32]);
        let path = dir.path().join("cache.bin");
        (dir, Cache::build(&gen, &path, 0).unwrap())
    }

    #[test]
    fn native_architecture_outranks_foreign() {
        let (_dir, cache) = two_arches();
        let comparator = ProviderComparator::new(&cache);
        let native_pkg = cache.find_package("libfoo", "amd64").unwrap();
        let foreign_pkg = cache.find_package("libfoo", "i386").unwrap();
        let native_ver = cache.package_versions(native_pkg)[0];
        let foreign_ver = cache.package_versions(foreign_pkg)[0];
        let mut candidates = vec![foreign_ver, native_ver];
        comparator.sort_best_first(native_pkg, &mut candidates);
        assert_eq!(candidates[0], native_ver);
    }
}
