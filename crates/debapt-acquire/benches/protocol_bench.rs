//! Benchmarks for the wire-protocol codec and the queue cycle algorithm,
//! the two hot paths a worker-heavy run spends most of its bookkeeping
//! time in.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio_util::codec::{Decoder, Encoder};

use debapt_acquire::item::Item;
use debapt_acquire::queue::Queue;
use debapt_acquire::{Stanza, StanzaCodec};

fn sample_stanza() -> Stanza {
    Stanza::new(600, "URI Acquire")
        .with_field("URI", "http://deb.debian.org/debian/pool/main/a/a/a_1.0-1_amd64.deb")
        .with_field("Filename", "/var/cache/apt/archives/partial/a_1.0-1_amd64.deb")
        .with_field("SHA256-Hash", "a".repeat(64))
        .with_field("Maximum-Size", "123456")
}

fn bench_encode(c: &mut Criterion) {
    let mut codec = StanzaCodec;
    c.bench_function("stanza_encode", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            codec.encode(black_box(sample_stanza()), &mut buf).unwrap();
            black_box(buf);
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut codec = StanzaCodec;
    let mut encoded = BytesMut::new();
    codec.encode(sample_stanza(), &mut encoded).unwrap();

    c.bench_function("stanza_decode", |b| {
        b.iter(|| {
            let mut buf = encoded.clone();
            black_box(codec.decode(&mut buf).unwrap());
        });
    });
}

fn bench_queue_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_cycle");
    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut queue = Queue::new("http:deb.debian.org");
                queue.max_pipe_depth = 10;
                for i in 0..size {
                    queue.enqueue(1, Item::new(format!("http://deb.debian.org/{i}.deb"), format!("/tmp/{i}.deb").into()));
                }
                black_box(queue.cycle());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_queue_cycle);
criterion_main!(benches);
