//! Random package-graph generators for stress/benchmark testing: a
//! synthetic repository of `n` packages with a configurable chance of a
//! `Depends` edge to an earlier package (kept acyclic by construction, so
//! the solver always has at least one satisfying assignment).

use rand::prelude::*;

use debapt_cache::{CacheGenerator, CompareOp, DepKind, DependencyRequest, MultiArch, Priority};

/// Knobs for [`random_repository`].
#[derive(Debug, Clone, Copy)]
pub struct RepoShape {
    pub package_count: usize,
    /// Probability (0.0-1.0) that a package depends on each earlier one.
    pub edge_probability: f64,
    /// Probability a dependency is wrapped in an OR-group with the next
    /// edge, instead of standing alone.
    pub or_group_probability: f64,
    pub seed: u64,
}

impl Default for RepoShape {
    fn default() -> Self {
        Self { package_count: 100, edge_probability: 0.05, or_group_probability: 0.1, seed: 0 }
    }
}

/// Build a synthetic single-architecture cache generator matching `shape`.
/// Package `i` may depend on any package `j < i` (edges only point
/// "backwards" in creation order, so the dependency graph is a DAG and
/// every package has at least a chance of being solvable without
/// backtracking to a contradiction).
#[must_use]
pub fn random_repository(shape: RepoShape) -> CacheGenerator {
    let mut rng = StdRng::seed_from_u64(shape.seed);
    let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
    let mut versions = Vec::with_capacity(shape.package_count);

    for i in 0..shape.package_count {
        let name = format!("pkg{i:05}");
        let pkg = gen.new_package(&name, "amd64");
        let ver = gen.new_version(
            pkg,
            "1.0-1",
            MultiArch::None,
            Priority::Optional,
            None,
            None,
            None,
            1024,
            512,
            synthetic_hash(i),
        );
        versions.push((pkg, ver));

        let mut pending_or = false;
        for j in 0..i {
            if !rng.gen_bool(shape.edge_probability) {
                continue;
            }
            let or_group = pending_or || rng.gen_bool(shape.or_group_probability);
            gen.new_depends(
                ver,
                &DependencyRequest {
                    target_package: &format!("pkg{j:05}"),
                    target_arch: None,
                    version_constraint: Some((CompareOp::GreaterEq, "1.0-1")),
                    kind: DepKind::DEPENDS,
                    or_group,
                },
            );
            pending_or = or_group && rng.gen_bool(0.5);
        }
    }

    gen
}

fn synthetic_hash(seed: usize) -> [u8; 32] {
    let mut hash = [0u8; 32];
    for (i, slot) in hash.iter_mut().enumerate() {
        *slot = ((seed.wrapping_mul(2654435761).wrapping_add(i)) & 0xff) as u8;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use debapt_cache::Cache;

    #[test]
    fn random_repository_builds_and_finds_packages() {
        let gen = random_repository(RepoShape { package_count: 20, ..RepoShape::default() });
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::build(&gen, &dir.path().join("cache.bin"), 0).unwrap();
        assert!(cache.find_package("pkg00000", "amd64").is_some());
        assert!(cache.find_package("pkg00019", "amd64").is_some());
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = random_repository(RepoShape { seed: 42, ..RepoShape::default() });
        let b = random_repository(RepoShape { seed: 42, ..RepoShape::default() });
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let cache_a = Cache::build(&a, &dir_a.path().join("a.bin"), 0).unwrap();
        let cache_b = Cache::build(&b, &dir_b.path().join("b.bin"), 0).unwrap();
        assert_eq!(cache_a.header().package_count, cache_b.header().package_count);
        assert_eq!(cache_a.header().dependency_count, cache_b.header().dependency_count);
    }
}
