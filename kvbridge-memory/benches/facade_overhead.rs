//! Compares raw `MemoryBackend` access against the same backend wrapped in
//! the `Kvbridge` facade, to put a number on what the cache-and-buffer layer
//! and per-key serializer cost on top of the backend they sit in front of.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvbridge::{CblConfig, Kvbridge};
use kvbridge_backend::{BincodeFormat, Format};
use kvbridge_core::{Key, Value};
use kvbridge_memory::MemoryBackend;

fn payload(size_bytes: usize) -> Value {
    Value::String("x".repeat(size_bytes))
}

fn bench_direct_backend(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("direct_backend");

    for (size_name, size_bytes) in [("1KB", 1024), ("10KB", 10 * 1024)] {
        group.throughput(Throughput::Bytes(size_bytes as u64));

        let backend = MemoryBackend::builder(10_000).build();
        let key = Key::new("bench-key");
        let raw = BincodeFormat.encode(&payload(size_bytes)).unwrap();

        runtime.block_on(async {
            kvbridge_backend::Backend::set(&backend, &key, raw.clone())
                .await
                .unwrap();
        });

        group.bench_with_input(
            BenchmarkId::new("set", size_name),
            &(&backend, &key, &raw),
            |b, (backend, key, raw)| {
                b.to_async(&runtime).iter(|| async move {
                    kvbridge_backend::Backend::set(*backend, key, (*raw).clone())
                        .await
                        .unwrap();
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("get", size_name),
            &(&backend, &key),
            |b, (backend, key)| {
                b.to_async(&runtime).iter(|| async move {
                    kvbridge_backend::Backend::get(*backend, key).await.unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_through_facade(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("through_facade");

    for (size_name, size_bytes) in [("1KB", 1024), ("10KB", 10 * 1024)] {
        group.throughput(Throughput::Bytes(size_bytes as u64));

        let backend = MemoryBackend::builder(10_000).build();
        let config = CblConfig::builder()
            .write_interval(Duration::from_millis(100))
            .build();
        let facade = Kvbridge::new(backend, config);
        runtime.block_on(facade.init()).unwrap();

        let key = Key::new("bench-key");
        let value = payload(size_bytes);
        runtime.block_on(facade.set(key.clone(), value.clone())).unwrap();

        group.bench_with_input(
            BenchmarkId::new("set", size_name),
            &(&facade, &key, &value),
            |b, (facade, key, value)| {
                b.to_async(&runtime).iter(|| async move {
                    facade.set((*key).clone(), (*value).clone()).await.unwrap();
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("get_cached", size_name),
            &(&facade, &key),
            |b, (facade, key)| {
                b.to_async(&runtime).iter(|| async move {
                    facade.get((*key).clone()).await.unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_direct_backend, bench_through_facade);
criterion_main!(benches);
