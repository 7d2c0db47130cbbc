//! Performance benchmarks for pool operations

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use blockpool::pool::LogLevel;
use blockpool::{BlockPool, Descriptor, PoolAllocator};

fn packet_pool() -> Arc<BlockPool> {
    BlockPool::new(
        vec![
            Descriptor::new(64, 64, 256, true),
            Descriptor::new(256, 32, 256, true),
            Descriptor::new(1500, 32, 256, true),
            Descriptor::new(65536, 0, 4, true),
        ],
        Some(Arc::new(|_: LogLevel, _: &str| {})),
        false,
    )
}

fn block_pool_benchmark(c: &mut Criterion) {
    let pool = packet_pool();

    let mut group = c.benchmark_group("block_pool");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_free_small", |b| {
        b.iter(|| {
            let p = pool.allocate(black_box(48)).unwrap();
            unsafe { pool.free(p).unwrap() };
        })
    });

    group.bench_function("allocate_free_mtu", |b| {
        b.iter(|| {
            let p = pool.allocate(black_box(1500)).unwrap();
            unsafe { pool.free(p).unwrap() };
        })
    });

    group.bench_function("acquire_release_cycle", |b| {
        b.iter(|| {
            let buf = pool.acquire(black_box(256)).unwrap();
            black_box(&buf);
            drop(buf);
        })
    });

    group.bench_function("heap_baseline", |b| {
        b.iter(|| {
            let v = vec![0u8; black_box(1500)];
            black_box(v);
        })
    });

    group.finish();
}

fn allocator_benchmark(c: &mut Criterion) {
    let alloc = PoolAllocator::<u32>::new(packet_pool());

    let mut group = c.benchmark_group("pool_allocator");
    group.bench_function("allocate_deallocate_64", |b| {
        b.iter(|| {
            let p = alloc.allocate(black_box(64)).unwrap();
            unsafe { alloc.deallocate(p.as_ptr(), 64) };
        })
    });
    group.finish();
}

fn statistics_benchmark(c: &mut Criterion) {
    let pool = packet_pool();

    let mut group = c.benchmark_group("statistics");
    group.bench_function("snapshot", |b| {
        b.iter(|| {
            let snapshot = pool.statistics();
            black_box(snapshot);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    block_pool_benchmark,
    allocator_benchmark,
    statistics_benchmark,
);
criterion_main!(benches);
