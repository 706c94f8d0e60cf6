//! How the backtracking solver's resolve time scales with repository
//! size, using the same randomized generator as `cache_generation`
//! (`debapt-solver`'s own in-tree bench only covers a single hand-built
//! dependency chain).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use debapt_bench::SCALES;
use debapt_cache::Cache;
use debapt_core::ids::PkgId;
use debapt_depcache::Policy;
use debapt_solver::{solve, Request};
use debapt_test_utils::generators::{random_repository, RepoShape};

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_scaling");
    let dir = tempfile::tempdir().unwrap();
    let policy = Policy::new(true, false);

    for &count in &SCALES {
        let shape = RepoShape { package_count: count, edge_probability: 0.08, or_group_probability: 0.15, seed: 7 };
        let generator = random_repository(shape);
        let path = dir.path().join(format!("solve-{count}.bin"));
        let cache = Cache::build(&generator, &path, 0).unwrap();

        // Request the last-created package: it has the deepest possible
        // dependency chain since edges only point backwards.
        let target = cache.find_package(&format!("pkg{:05}", count - 1), "amd64").unwrap();

        group.bench_with_input(BenchmarkId::new("solve", count), &count, |b, _| {
            b.iter(|| {
                let mut request = Request::new();
                request.install(target);
                black_box(solve(&cache, &policy, &request).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solve);
criterion_main!(benches);
