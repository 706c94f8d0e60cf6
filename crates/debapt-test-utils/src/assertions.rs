//! Domain-specific assertion helpers for `debapt` testing: dep-cache
//! state checks and the solver-soundness property from `spec.md` §8.

use std::collections::HashSet;

use debapt_cache::{Cache, DepKind};
use debapt_core::ids::{PkgId, VerId};
use debapt_depcache::{DepCache, Mode};
use debapt_solver::Transaction;

/// Assert `pkg` is marked `Install` in `depcache` (and, if `expected_ver`
/// is `Some`, that it's installing exactly that version).
pub fn assert_install(depcache: &DepCache<'_>, pkg: PkgId, expected_ver: Option<VerId>) {
    let state = depcache.package_state(pkg);
    assert_eq!(state.mode, Mode::Install, "{pkg:?} should be marked Install, got {:?}", state.mode);
    if let Some(expected) = expected_ver {
        assert_eq!(state.install_version, Some(expected), "{pkg:?} installing the wrong version");
    }
}

/// Assert `pkg` is marked `Keep` (no pending change) in `depcache`.
pub fn assert_kept(depcache: &DepCache<'_>, pkg: PkgId) {
    let state = depcache.package_state(pkg);
    assert_eq!(state.mode, Mode::Keep, "{pkg:?} should be marked Keep, got {:?}", state.mode);
}

/// Assert `pkg` is marked `Delete` in `depcache`.
pub fn assert_deleted(depcache: &DepCache<'_>, pkg: PkgId) {
    let state = depcache.package_state(pkg);
    assert_eq!(state.mode, Mode::Delete, "{pkg:?} should be marked Delete, got {:?}", state.mode);
}

/// **Testable property 5 (solver minimality on no-op).** Assert the
/// dep-cache overlay has performed zero installs, deletes, or upgrades.
pub fn assert_no_op(depcache: &DepCache<'_>) {
    assert_eq!(depcache.install_count(), 0, "expected zero installs");
    assert_eq!(depcache.delete_count(), 0, "expected zero deletes");
}

/// **Testable property 4 (solver soundness).** For every `Decided` entry
/// in `txn`, every critical dependency of its committed version must be
/// satisfied by some other `Must`-installed package/provides in the
/// transaction, or must be a non-critical kind. Panics with the first
/// violation found.
pub fn assert_solver_sound(cache: &Cache, txn: &Transaction) {
    let installed: HashSet<VerId> = txn.install.iter().map(|d| d.version).collect();
    let installed_pkgs: HashSet<PkgId> =
        txn.install.iter().map(|d| cache.version(d.version).parent_package).map(PkgId::new).collect();

    for decided in &txn.install {
        for dep_id in cache.version_depends(decided.version) {
            let dep = cache.dependency(dep_id);
            if !DepKind(dep.kind).is_critical() {
                continue;
            }
            let target = PkgId::new(dep.target_package);
            let satisfied = installed_pkgs.contains(&target) && version_satisfies_dep(cache, dep_id, &installed)
                || provides_satisfy_dep(cache, target, &installed);
            assert!(
                satisfied,
                "unsound transaction: {:?}'s critical dependency on {:?} isn't satisfied by anything Must-installed",
                decided.version, target,
            );
        }
    }
}

fn version_satisfies_dep(cache: &Cache, dep_id: debapt_core::ids::DepId, installed: &HashSet<VerId>) -> bool {
    let dep = cache.dependency(dep_id);
    let target = PkgId::new(dep.target_package);
    cache.package_versions(target).into_iter().any(|v| installed.contains(&v))
}

fn provides_satisfy_dep(cache: &Cache, target: PkgId, installed: &HashSet<VerId>) -> bool {
    cache.package_rev_provides(target).into_iter().any(|provide_id| {
        let provide = cache.provides_record(provide_id);
        installed.contains(&VerId::new(provide.version))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_trivial_install;
    use debapt_depcache::Policy;
    use debapt_solver::{solve, Request};

    #[test]
    fn trivial_install_is_sound() {
        let (_dir, cache, (a, _b)) = scenario_trivial_install();
        let policy = Policy::new(false, false);
        let mut request = Request::new();
        request.install(PkgId::new(a));
        let txn = solve(&cache, &policy, &request).unwrap();
        assert_solver_sound(&cache, &txn);
    }
}
