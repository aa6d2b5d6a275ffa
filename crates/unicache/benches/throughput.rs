//! Benchmarks for unicache store operations

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;
use unicache::{
    Cache, CacheMode, CacheRegistry, CacheSettings, ManagedCache, MemoryBackend, MemoryConfig,
};

type Store = ManagedCache<MemoryBackend, unicache::JsonSerializer, unicache::NoopMetrics>;

fn create_cache(version: &str, mode: CacheMode) -> (MemoryBackend, Arc<Store>) {
    let backend = MemoryBackend::new(MemoryConfig::default());
    let settings = CacheSettings {
        mode,
        ..CacheSettings::new(version)
    };
    let registry = CacheRegistry::new(backend.clone(), settings).unwrap();
    (backend, registry.get_cache("bench").unwrap())
}

fn bench_put(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_, versioned) = create_cache("1", CacheMode::Versioned);
    let (_, plain) = create_cache("1", CacheMode::Plain);

    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("versioned_small", |b| {
        b.iter(|| {
            rt.block_on(async {
                versioned.put(black_box("key"), black_box(&42i32)).await;
            });
        });
    });

    group.bench_function("versioned_1kb", |b| {
        let value = "x".repeat(1024);
        b.iter(|| {
            rt.block_on(async {
                versioned.put(black_box("key"), black_box(&value)).await;
            });
        });
    });

    group.bench_function("plain_small", |b| {
        b.iter(|| {
            rt.block_on(async {
                plain.put(black_box("key"), black_box(&42i32)).await;
            });
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_, cache) = create_cache("1", CacheMode::Versioned);

    rt.block_on(async {
        cache.put("key", &42i32).await;
    });

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result: Option<i32> = cache.get(black_box("key")).await;
                black_box(result);
            });
        });
    });

    // Miss walks the other version slots before giving up
    group.bench_function("miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result: Option<i32> = cache.get(black_box("nonexistent")).await;
                black_box(result);
            });
        });
    });

    group.finish();
}

fn bench_promotion(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (backend, old) = create_cache("876", CacheMode::Versioned);
    let registry = CacheRegistry::new(backend, CacheSettings::new("877")).unwrap();
    let new = registry.get_cache("bench").unwrap();

    let mut group = c.benchmark_group("promotion");
    group.throughput(Throughput::Elements(1));

    group.bench_function("promote_and_read", |b| {
        b.iter(|| {
            rt.block_on(async {
                old.evict("key").await;
                old.put("key", &"value".to_string()).await;
                let result: Option<String> = new.get(black_box("key")).await;
                black_box(result);
            });
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_, cache) = create_cache("1", CacheMode::Versioned);

    rt.block_on(async {
        for i in 0..100u64 {
            cache.put(&i, &i).await;
        }
    });

    let mut group = c.benchmark_group("concurrent");
    group.throughput(Throughput::Elements(100));

    group.bench_function("100_parallel_gets", |b| {
        b.iter(|| {
            rt.block_on(async {
                let handles: Vec<_> = (0..100u64)
                    .map(|i| {
                        let cache = cache.clone();
                        tokio::spawn(async move {
                            let result: Option<u64> = cache.get(&i).await;
                            black_box(result)
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.await.unwrap();
                }
            });
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_promotion,
    bench_concurrent
);
criterion_main!(benches);
