//! Benchmarks for the cheap half of the trust gate: RFC 2822 date parsing
//! and freshness evaluation, run once per Release file merged.

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use debapt_trust::{check_freshness, parse_release_date, FreshnessPolicy};

fn bench_parse_release_date(c: &mut Criterion) {
    c.bench_function("parse_release_date", |b| {
        b.iter(|| black_box(parse_release_date("Mon, 01 Jan 2024 00:00:00 UTC").unwrap()));
    });
}

fn bench_check_freshness(c: &mut Criterion) {
    let policy = FreshnessPolicy { valid_until_min: Some(Duration::days(1)), ..FreshnessPolicy::default() };
    let date = parse_release_date("Mon, 01 Jan 2024 00:00:00 UTC").unwrap();
    let valid_until = parse_release_date("Mon, 08 Jan 2024 00:00:00 UTC").unwrap();
    let now = parse_release_date("Wed, 03 Jan 2024 00:00:00 UTC").unwrap();

    c.bench_function("check_freshness", |b| {
        b.iter(|| black_box(check_freshness(Some(date), Some(valid_until), now, &policy)));
    });
}

criterion_group!(benches, bench_parse_release_date, bench_check_freshness);
criterion_main!(benches);
