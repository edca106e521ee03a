//! Encoder micro-benchmarks.

#![allow(missing_docs)]

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rsql_protocol::{encode, wire_type};

fn bench_append_uint(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_uint64");
    for (name, value) in [
        ("fixint", 42u64),
        ("uint16", 40_000u64),
        ("uint64", u64::MAX),
    ] {
        group.bench_function(name, |b| {
            let mut buf = BytesMut::with_capacity(16);
            b.iter(|| {
                buf.clear();
                encode::append_uint64(&mut buf, black_box(value));
            });
        });
    }
    group.finish();
}

fn bench_append_str(c: &mut Criterion) {
    let text = "SELECT orderid, customerid, total FROM orders WHERE customerid = 123";
    c.bench_function("append_str", |b| {
        let mut buf = BytesMut::with_capacity(128);
        b.iter(|| {
            buf.clear();
            encode::append_str(&mut buf, black_box(text));
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| {
            for prefix in 0u8..=255 {
                black_box(wire_type::classify(black_box(prefix)));
            }
        });
    });
}

criterion_group!(benches, bench_append_uint, bench_append_str, bench_classify);
criterion_main!(benches);
