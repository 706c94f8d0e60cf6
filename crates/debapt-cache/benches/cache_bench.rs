//! Benchmarks for cache generation, image write/open, and lookups.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use debapt_cache::gen::{CacheGenerator, DependencyRequest};
use debapt_cache::entities::{CompareOp, DepKind, MultiArch, Priority};
use debapt_cache::Cache;

fn populate(n: usize) -> CacheGenerator {
    let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
    for i in 0..n {
        let name = format!("pkg-{i}");
        let pkg = gen.new_package(&name, "amd64");
        let ver = gen.new_version(
            pkg,
            "1.0-1",
            MultiArch::None,
            Priority::Optional,
            Some("misc"),
            None,
            None,
            1024,
            512,
            [0u8; 32],
        );
        if i > 0 {
            gen.new_depends(
                ver,
                &DependencyRequest {
                    target_package: &format!("pkg-{}", i - 1),
                    target_arch: None,
                    version_constraint: Some((CompareOp::GreaterEq, "1.0-1")),
                    kind: DepKind::DEPENDS,
                    or_group: false,
                },
            );
        }
    }
    gen
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_generation");
    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("build", size), &size, |b, &size| {
            b.iter(|| black_box(populate(size)));
        });
    }
    group.finish();
}

fn bench_image_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_image");
    let dir = tempfile::tempdir().unwrap();

    for size in [100, 1_000, 10_000] {
        let gen = populate(size);
        let path = dir.path().join(format!("image-{size}.bin"));

        group.bench_with_input(BenchmarkId::new("write_and_open", size), &size, |b, _| {
            b.iter(|| {
                black_box(Cache::build(&gen, &path, 0).unwrap());
            });
        });

        let cache = Cache::build(&gen, &path, 0).unwrap();
        group.bench_with_input(BenchmarkId::new("open_existing", size), &size, |b, _| {
            b.iter(|| black_box(Cache::open(&path).unwrap().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("find_package", size), &size, |b, &size| {
            let name = format!("pkg-{}", size / 2);
            b.iter(|| black_box(cache.find_package(&name, "amd64")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generation, bench_image_roundtrip);
criterion_main!(benches);
