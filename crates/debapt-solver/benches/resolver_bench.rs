//! Benchmarks for the backtracking solver over a synthetic chain of
//! packages, each critically depending on the next -- the shape that
//! exercises the work queue and OR-group bookkeeping without needing a
//! real archive on disk.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use debapt_cache::{Cache, CacheGenerator, DepKind, DependencyRequest, MultiArch, Priority};
use debapt_depcache::Policy;
use debapt_solver::{solve, Request};

/// `n` packages `pkg0 .. pkg{n-1}`, each critically depending on the
/// next, terminating in a leaf with no dependencies.
fn chain_cache(n: usize) -> (tempfile::TempDir, Cache) {
    let dir = tempfile::tempdir().unwrap();
    let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);

    let mut versions = Vec::with_capacity(n);
    for i in 0..n {
        let name = format!("pkg{i}");
        let pkg = gen.new_package(&name, "amd64");
        let ver = gen.new_version(pkg, "1.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [i as u8; 32]);
        versions.push(ver);
    }
    for i in 0..n.saturating_sub(1) {
        gen.new_depends(
            versions[i],
            &DependencyRequest {
                target_package: &format!("pkg{}", i + 1),
                target_arch: None,
                version_constraint: None,
                kind: DepKind::DEPENDS,
                or_group: false,
            },
        );
    }

    let path = dir.path().join("cache.bin");
    let cache = Cache::build(&gen, &path, 0).unwrap();
    (dir, cache)
}

fn bench_chain_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_chain");
    for &n in &[10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (_dir, cache) = chain_cache(n);
            let policy = Policy::new(false, false);
            let root = cache.find_package("pkg0", "amd64").unwrap();
            b.iter(|| {
                let mut request = Request::new();
                request.install(root);
                let txn = solve(black_box(&cache), &policy, &request).unwrap();
                black_box(txn);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain_resolve);
criterion_main!(benches);
