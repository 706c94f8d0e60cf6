//! Benchmarks the acquire engine's enqueue-and-route path: parsing each
//! item's URI and bucketing it into a per-host queue, the bookkeeping
//! `Engine::enqueue` does before any worker is ever spawned.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use debapt_acquire::{Engine, Item};
use debapt_config::{AcquireConfig, QueueMode};

const HOST_COUNTS: [usize; 3] = [1, 8, 32];
const ITEMS_PER_HOST: usize = 200;

fn synthetic_items(host_count: usize) -> Vec<(u64, Item)> {
    (0..host_count * ITEMS_PER_HOST)
        .map(|i| {
            let host = i % host_count;
            let uri = format!("http://mirror{host}.example.org/debian/pool/pkg{i:06}.deb");
            let item = Item::new(uri, std::path::PathBuf::from(format!("/tmp/archives/pkg{i:06}.deb")));
            (0u64, item)
        })
        .collect()
}

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_routing");

    for &hosts in &HOST_COUNTS {
        let items = synthetic_items(hosts);
        group.throughput(Throughput::Elements(items.len() as u64));
        group.bench_with_input(BenchmarkId::new("enqueue", hosts), &hosts, |b, _| {
            b.iter(|| {
                let config = AcquireConfig { queue_mode: QueueMode::Host, ..AcquireConfig::default() };
                let mut engine = Engine::new(config);
                for (owner, item) in items.clone() {
                    black_box(engine.enqueue(owner, item).unwrap());
                }
                black_box(engine.item_counts());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_enqueue);
criterion_main!(benches);
