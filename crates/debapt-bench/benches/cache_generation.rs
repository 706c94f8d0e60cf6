//! Benchmarks building the on-disk cache image from a synthetic
//! repository at increasing scale, mirroring `debapt-cache`'s own
//! roundtrip bench but driven by `debapt-test-utils`'s randomized
//! repository generator instead of a uniform chain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use debapt_bench::SCALES;
use debapt_cache::Cache;
use debapt_test_utils::generators::{random_repository, RepoShape};

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_generation");
    let dir = tempfile::tempdir().unwrap();

    for &count in &SCALES {
        let shape = RepoShape { package_count: count, ..RepoShape::default() };
        let generator = random_repository(shape);
        let path = dir.path().join(format!("synthetic-{count}.bin"));

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("build", count), &count, |b, _| {
            b.iter(|| {
                black_box(Cache::build(&generator, &path, 0).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_generation_lookup");
    let dir = tempfile::tempdir().unwrap();

    for &count in &SCALES {
        let shape = RepoShape { package_count: count, ..RepoShape::default() };
        let generator = random_repository(shape);
        let path = dir.path().join(format!("lookup-{count}.bin"));
        let cache = Cache::build(&generator, &path, 0).unwrap();
        let target = format!("pkg{:05}", count / 2);

        group.bench_with_input(BenchmarkId::new("find_package", count), &count, |b, _| {
            b.iter(|| black_box(cache.find_package(&target, "amd64")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
