//! Pre-built cache/dep-cache fixtures for the concrete scenarios
//! `spec.md` §8 names (S1-S4), plus small generic builders every crate's
//! own unit tests reach for instead of hand-rolling a `CacheGenerator`
//! sequence.

use debapt_cache::{Cache, CacheGenerator, CompareOp, DepKind, DependencyRequest, MultiArch, Priority};
use debapt_depcache::Policy;

/// Build a [`Cache`] from a closure that populates a [`CacheGenerator`],
/// mirroring the `build()` helper every crate's own `#[cfg(test)]` module
/// already uses (e.g. `debapt_solver::resolver::tests::build`). The
/// `TempDir` must outlive the `Cache` (it backs the mmap'd image file).
pub fn build_cache(f: impl FnOnce(&mut CacheGenerator)) -> (tempfile::TempDir, Cache) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
    f(&mut gen);
    let path = dir.path().join("cache.bin");
    let cache = Cache::build(&gen, &path, 0).expect("cache builds");
    (dir, cache)
}

/// A no-frills single-version package, `multi-arch: none`, `Priority::Optional`.
pub fn add_simple_package(gen: &mut CacheGenerator, name: &str, version: &str) -> u32 {
    let pkg = gen.new_package(name, "amd64");
    gen.new_version(pkg, version, MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash(name, version));
    pkg
}

fn control_hash(name: &str, version: &str) -> [u8; 32] {
    let mut hash = [0u8; 32];
    let bytes = format!("{name}={version}");
    for (slot, byte) in hash.iter_mut().zip(bytes.bytes().cycle()) {
        *slot = byte;
    }
    hash
}

/// Declare a plain (non-OR, non-versioned) `Depends` from `on_version` onto
/// `target`.
pub fn depend_on(gen: &mut CacheGenerator, on_version: u32, target: &str) -> u32 {
    gen.new_depends(
        on_version,
        &DependencyRequest { target_package: target, target_arch: None, version_constraint: None, kind: DepKind::DEPENDS, or_group: false },
    )
}

/// A default, install-recommends/install-suggests-off policy -- the
/// common case for solver/dep-cache fixtures that don't care about those
/// knobs.
#[must_use]
pub fn default_policy() -> Policy {
    Policy::new(false, false)
}

/// **S1 -- Trivial install.** `a (=1)` depends on `b (>= 1)`; `b (=1)` is
/// present. Returns the cache plus `(a, b)` package ids.
pub fn scenario_trivial_install() -> (tempfile::TempDir, Cache, (u32, u32)) {
    let mut ids = (0, 0);
    let (dir, cache) = build_cache(|gen| {
        let b = gen.new_package("b", "amd64");
        gen.new_version(b, "1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("b", "1"));

        let a = gen.new_package("a", "amd64");
        let a_ver =
            gen.new_version(a, "1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("a", "1"));
        gen.new_depends(
            a_ver,
            &DependencyRequest {
                target_package: "b",
                target_arch: None,
                version_constraint: Some((CompareOp::GreaterEq, "1")),
                kind: DepKind::DEPENDS,
                or_group: false,
            },
        );
        ids = (a, b);
    });
    (dir, cache, ids)
}

/// **S2 -- OR-group fallback.** `a` depends on `x|y`; `x` has no
/// candidate anywhere, `y (=1)` is available. Returns `(a, y)`.
pub fn scenario_or_group_fallback() -> (tempfile::TempDir, Cache, (u32, u32)) {
    let mut ids = (0, 0);
    let (dir, cache) = build_cache(|gen| {
        // `x` is declared as a dependency target but never given a
        // version: a package that exists purely virtually, per `spec.md`
        // §3's "a package may have no versions".
        let _x = gen.new_package("x", "amd64");

        let y = gen.new_package("y", "amd64");
        gen.new_version(y, "1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("y", "1"));

        let a = gen.new_package("a", "amd64");
        let a_ver =
            gen.new_version(a, "1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("a", "1"));
        gen.new_depends(
            a_ver,
            &DependencyRequest { target_package: "x", target_arch: None, version_constraint: None, kind: DepKind::DEPENDS, or_group: true },
        );
        gen.new_depends(
            a_ver,
            &DependencyRequest { target_package: "y", target_arch: None, version_constraint: None, kind: DepKind::DEPENDS, or_group: false },
        );
        ids = (a, y);
    });
    (dir, cache, ids)
}

/// **S4 -- Conflicts breaks upgrade.** `a (=2)` Conflicts `b (< 3)`;
/// `a`'s installed version is `1` (no conflict), candidate is `2`. `b`'s
/// only version present is `2`. Returns `(a, b)`.
pub fn scenario_conflicts_breaks_upgrade() -> (tempfile::TempDir, Cache, (u32, u32)) {
    let mut ids = (0, 0);
    let (dir, cache) = build_cache(|gen| {
        let b = gen.new_package("b", "amd64");
        gen.new_version(b, "2", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("b", "2"));

        let a = gen.new_package("a", "amd64");
        gen.new_version(a, "1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("a", "1"));
        let a2 = gen.new_version(a, "2", MultiArch::None, Priority::Optional, None, None, None, 1, 1, control_hash("a", "2"));
        gen.new_depends(
            a2,
            &DependencyRequest {
                target_package: "b",
                target_arch: None,
                version_constraint: Some((CompareOp::Less, "3")),
                kind: DepKind::CONFLICTS,
                or_group: false,
            },
        );
        ids = (a, b);
    });
    (dir, cache, ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_install_has_both_packages() {
        let (_dir, cache, (a, b)) = scenario_trivial_install();
        assert_eq!(cache.find_package("a", "amd64"), Some(debapt_core::ids::PkgId::new(a)));
        assert_eq!(cache.find_package("b", "amd64"), Some(debapt_core::ids::PkgId::new(b)));
    }
}
