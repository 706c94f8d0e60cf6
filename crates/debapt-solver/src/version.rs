//! Version-set helpers the backtracking loop needs that aren't already on
//! `debapt_cache::Cache` or `debapt_depcache::Policy`: OR-group recovery,
//! constraint matching, and obsolescence detection.
//!
//! `solver3.cc` keeps its own copies of `VersionSatisfiesConstraint` and
//! the OR-group walk rather than sharing `depcache.cc`'s; we mirror that
//! split instead of threading a `debapt_depcache` dependency through the
//! hot path.

use debapt_cache::{Cache, TrustFlags};
use debapt_core::ids::{DepId, PkgId, VerId};

/// Recover OR-group declaration order and chunk into groups.
///
/// `version_depends` walks a chain built by prepend, so it yields the
/// reverse of declaration order; reverse it back before chunking on the
/// `or_group` flag (a group ends at, and includes, the first member whose
/// flag is `false`).
pub fn or_groups(cache: &Cache, ver: VerId) -> Vec<Vec<DepId>> {
    let mut deps = cache.version_depends(ver);
    deps.reverse();
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for dep_id in deps {
        let continues = cache.dependency(dep_id).or_group != 0;
        current.push(dep_id);
        if !continues {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Whether `candidate_ver_str` satisfies `dep_id`'s version constraint (an
/// unconstrained dependency is satisfied by anything).
pub fn version_satisfies_constraint(cache: &Cache, dep_id: DepId, candidate_ver_str: &str) -> bool {
    match cache.dependency_constraint(dep_id) {
        None => true,
        Some((op, constraint_str)) => {
            match (candidate_ver_str.parse::<deb::version::Version>(), constraint_str.parse::<deb::version::Version>())
            {
                (Ok(lhs), Ok(rhs)) => op.eval(&lhs, &rhs),
                _ => false,
            }
        }
    }
}

/// Every version of `dep_id`'s target package that satisfies its
/// constraint -- the set a Conflicts/Breaks/Obsoletes dependency forbids,
/// or a positive dependency's set of acceptable targets.
pub fn matching_target_versions(cache: &Cache, dep_id: DepId) -> Vec<VerId> {
    let target = PkgId::new(cache.dependency(dep_id).target_package);
    cache
        .package_versions(target)
        .into_iter()
        .filter(|&v| version_satisfies_constraint(cache, dep_id, cache.version_string(v)))
        .collect()
}

fn has_non_not_source_file(cache: &Cache, ver: VerId) -> bool {
    let files = cache.version_files(ver);
    !files.is_empty()
        && files.iter().any(|&f| {
            cache
                .package_file_release(f)
                .is_none_or(|rls| !TrustFlags(rls.trust_flags).contains(TrustFlags::NOT_SOURCE))
        })
}

/// `spec.md` §4.4's obsolescence rule, used by the solver to prefer a
/// non-obsolete provider on upgrade: a version is obsolete if it has no
/// downloadable (non-`NotSource`) file, or if its source package has a
/// sibling binary built from a strictly greater source version.
///
/// This is a linear scan over every package's versions rather than a
/// source-name index (`apt-pkg/pkgcachegen.cc`'s `Source` hash) -- the
/// cache doesn't build one, and re-deriving it here would duplicate a
/// generation-time structure for a check the solver runs rarely.
#[must_use]
pub fn is_obsolete(cache: &Cache, ver: VerId) -> bool {
    if !has_non_not_source_file(cache, ver) {
        return true;
    }
    let source_name = cache.version_source_package(ver);
    let Ok(my_source_ver) = cache.version_source_version(ver).parse::<deb::version::Version>() else {
        return false;
    };

    for idx in 1..=cache.header().package_count {
        for other in cache.package_versions(PkgId::new(idx)) {
            if other == ver || cache.version_source_package(other) != source_name {
                continue;
            }
            if let Ok(other_ver) = cache.version_source_version(other).parse::<deb::version::Version>() {
                if other_ver > my_source_ver {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use debapt_cache::{CacheGenerator, DepKind, DependencyRequest, MultiArch, Priority};

    use super::*;

    fn cache_with_sources() -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);

        let file = gen.new_package_file("status", "", "amd64", 0, 0);

        let old_bin = gen.new_package("libfoo1", "amd64");
        let old_ver = gen.new_version(
            old_bin,
            "1.0-1",
            MultiArch::None,
            Priority::Optional,
            None,
            Some("foo"),
            Some("1.0-1"),
            1,
            1,
            [1u8; 32],
        );
        gen.new_ver_file(old_ver, file);

        let new_bin = gen.new_package("libfoo2", "amd64");
        let new_ver = gen.new_version(
            new_bin,
            "2.0-1",
            MultiArch::None,
            Priority::Optional,
            None,
            Some("foo"),
            Some("2.0-1"),
            1,
            1,
            [2u8; 32],
        );
        gen.new_ver_file(new_ver, file);

        let path = dir.path().join("cache.bin");
        (dir, Cache::build(&gen, &path, 0).unwrap())
    }

    #[test]
    fn older_source_sibling_is_obsolete() {
        let (_dir, cache) = cache_with_sources();
        let old_pkg = cache.find_package("libfoo1", "amd64").unwrap();
        let new_pkg = cache.find_package("libfoo2", "amd64").unwrap();
        let old_ver = cache.package_versions(old_pkg)[0];
        let new_ver = cache.package_versions(new_pkg)[0];
        assert!(is_obsolete(&cache, old_ver));
        assert!(!is_obsolete(&cache, new_ver));
    }

    #[test]
    fn or_groups_recovers_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        let editor = gen.new_package("an-editor", "amd64");
        let ver = gen.new_version(editor, "1.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [3u8; 32]);
        gen.new_depends(
            ver,
            &DependencyRequest {
                target_package: "vim",
                target_arch: None,
                version_constraint: None,
                kind: DepKind::DEPENDS,
                or_group: true,
            },
        );
        gen.new_depends(
            ver,
            &DependencyRequest {
                target_package: "nano",
                target_arch: None,
                version_constraint: None,
                kind: DepKind::DEPENDS,
                or_group: false,
            },
        );
        let path = dir.path().join("cache.bin");
        let cache = Cache::build(&gen, &path, 0).unwrap();
        let groups = or_groups(&cache, ver);
        assert_eq!(groups.len(), 1);
        let targets: Vec<_> =
            groups[0].iter().map(|&d| cache.package_name(PkgId::new(cache.dependency(d).target_package))).collect();
        assert_eq!(targets, vec!["vim", "nano"]);
    }
}
