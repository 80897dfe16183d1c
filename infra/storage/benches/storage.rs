use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use depot_storage::{
    CacheOptions, CacheWrapper, Context, LocalStorage, MemoryStorage, Scope, CloudStorageTiers, WriterOptions,
    read, visitor, walk_n, write,
};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Benchmark: Scope Resolution
// ============================================================================

fn bench_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope");

    group.bench_function("resolve_cloud_tiers", |b| {
        b.iter(|| {
            black_box(black_box(Scope::WRITE | Scope::SIGN_URL).resolve(&CloudStorageTiers));
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Memory Backend
// ============================================================================

fn bench_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = Context::background();

    let sizes = [("1KB", 1024), ("64KB", 64 * 1024), ("1MB", 1024 * 1024)];
    for (name, size) in sizes {
        let data: Vec<u8> = (0..size).map(|i| u8::try_from(i % 256).unwrap()).collect();
        let store = MemoryStorage::new();
        rt.block_on(write(&ctx, &store, "obj", &data, &WriterOptions::default())).unwrap();

        group.throughput(Throughput::Bytes(u64::try_from(size).unwrap_or(u64::MAX)));
        group.bench_with_input(BenchmarkId::new("read", name), &store, |b, store| {
            b.to_async(&rt).iter(|| async {
                black_box(read(&ctx, store, "obj").await.unwrap());
            });
        });
        group.bench_with_input(BenchmarkId::new("write", name), &data, |b, data| {
            b.to_async(&rt).iter(|| async {
                write(&ctx, &store, "obj", data, &WriterOptions::default()).await.unwrap();
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Cache-Aside Hit Path
// ============================================================================

fn bench_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    group.measurement_time(Duration::from_secs(10));

    let temp = TempDir::new().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = Context::background();
    let data = vec![42u8; 16 * 1024];

    let (local, cached) = rt.block_on(async {
        let local = LocalStorage::builder().root(temp.path()).connect().await.unwrap();
        let cached = CacheWrapper::new(
            Arc::new(local.clone()),
            Arc::new(MemoryStorage::new()),
            CacheOptions::with_max_age(Duration::from_secs(3600)),
        );
        write(&ctx, &cached, "hot.dat", &data, &WriterOptions::default()).await.unwrap();
        read(&ctx, &cached, "hot.dat").await.unwrap();
        (local, cached)
    });

    group.bench_function("local_direct", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(read(&ctx, &local, "hot.dat").await.unwrap());
        });
    });

    group.bench_function("cache_hit", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(read(&ctx, &cached, "hot.dat").await.unwrap());
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Bounded Walk
// ============================================================================

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");

    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = Context::background();
    let store = MemoryStorage::new();
    rt.block_on(async {
        for i in 0..1000 {
            write(&ctx, &store, &format!("tree/{}/{i}", i % 32), b"", &WriterOptions::default())
                .await
                .unwrap();
        }
    });

    for width in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::new("walk_n", width), &width, |b, &width| {
            b.to_async(&rt).iter(|| async {
                walk_n(
                    &ctx,
                    &store,
                    "tree/",
                    width,
                    visitor(|p| async move {
                        black_box(p);
                        Ok(())
                    }),
                )
                .await
                .unwrap();
            });
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_scope, bench_memory, bench_cache_hit, bench_walk);

criterion_main!(benches);
