//! Benchmarks for the value codec and body serializers

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use unicache_core::{FingerprintRegistry, JsonSerializer, Serializer, ValueCodec};
use unicache_derive::CacheValue;

#[cfg(feature = "msgpack")]
use unicache_core::MsgPackSerializer;

#[cfg(feature = "bincode")]
use unicache_core::BincodeSerializer;

/// Test data structure for benchmarking
#[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
struct TestData {
    id: u64,
    name: String,
    values: Vec<i32>,
    metadata: HashMap<String, String>,
}

impl TestData {
    fn small() -> Self {
        Self {
            id: 12345,
            name: "test".to_string(),
            values: vec![1, 2, 3],
            metadata: HashMap::new(),
        }
    }

    fn medium() -> Self {
        let mut metadata = HashMap::new();
        for i in 0..10 {
            metadata.insert(format!("key_{}", i), format!("value_{}", i));
        }
        Self {
            id: 12345,
            name: "test medium data structure".to_string(),
            values: (0..100).collect(),
            metadata,
        }
    }

    fn large() -> Self {
        let mut metadata = HashMap::new();
        for i in 0..100 {
            metadata.insert(format!("key_{}", i), "x".repeat(100));
        }
        Self {
            id: 12345,
            name: "test large data structure with lots of content".to_string(),
            values: (0..1000).collect(),
            metadata,
        }
    }
}

fn cases() -> Vec<(&'static str, TestData)> {
    vec![
        ("small", TestData::small()),
        ("medium", TestData::medium()),
        ("large", TestData::large()),
    ]
}

fn bench_codec<S: Serializer>(c: &mut Criterion, label: &str, serializer: S) {
    let codec = ValueCodec::new(Arc::new(FingerprintRegistry::new()), serializer);

    let mut group = c.benchmark_group(format!("codec_{}", label));
    for (name, data) in &cases() {
        let bytes = codec.encode(data).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", name), data, |b, data| {
            b.iter(|| black_box(codec.encode(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| {
                let value: TestData = codec.decode(black_box(bytes)).unwrap();
                black_box(value);
            });
        });
    }
    group.finish();
}

fn bench_json(c: &mut Criterion) {
    bench_codec(c, "json", JsonSerializer);
}

#[cfg(feature = "msgpack")]
fn bench_msgpack(c: &mut Criterion) {
    bench_codec(c, "msgpack", MsgPackSerializer);
}

#[cfg(not(feature = "msgpack"))]
fn bench_msgpack(_c: &mut Criterion) {}

#[cfg(feature = "bincode")]
fn bench_bincode(c: &mut Criterion) {
    bench_codec(c, "bincode", BincodeSerializer);
}

#[cfg(not(feature = "bincode"))]
fn bench_bincode(_c: &mut Criterion) {}

fn bench_fingerprint_lookup(c: &mut Criterion) {
    let registry = FingerprintRegistry::new();
    registry.fingerprint_of::<TestData>();

    c.bench_function("fingerprint_memoized", |b| {
        b.iter(|| black_box(registry.fingerprint_of::<TestData>()));
    });
}

fn bench_header_inspect(c: &mut Criterion) {
    let codec = ValueCodec::json();
    let bytes = codec.encode(&TestData::large()).unwrap();

    c.bench_function("inspect_header", |b| {
        b.iter(|| black_box(codec.inspect(black_box(&bytes)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_json,
    bench_msgpack,
    bench_bincode,
    bench_fingerprint_lookup,
    bench_header_inspect,
);
criterion_main!(benches);
