//! Hot-path benchmarks: pooled recycling vs. the system allocator.

use std::hint::black_box;

use blockpool::{BlockPool, PoolConfig};
use criterion::{Criterion, criterion_group, criterion_main};

fn alloc_free_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_cycle");

    let pool = BlockPool::with_config(PoolConfig::production()).unwrap();
    group.bench_function("blockpool_64", |b| {
        b.iter(|| {
            let block = pool.allocate(black_box(64)).unwrap();
            unsafe { pool.free(block, 64) };
            block
        });
    });

    let single = BlockPool::with_config(PoolConfig::single_thread()).unwrap();
    group.bench_function("blockpool_64_single_thread", |b| {
        b.iter(|| {
            let block = single.allocate(black_box(64)).unwrap();
            unsafe { single.free(block, 64) };
            block
        });
    });

    group.bench_function("system_64", |b| {
        b.iter(|| black_box(vec![0u8; 64]));
    });

    group.finish();
}

fn mixed_classes(c: &mut Criterion) {
    let pool = BlockPool::with_config(PoolConfig::production()).unwrap();
    let sizes = [8usize, 24, 64, 80, 256, 1024];

    c.bench_function("mixed_class_churn", |b| {
        b.iter(|| {
            let blocks: Vec<_> = sizes
                .iter()
                .map(|&size| (pool.allocate(size).unwrap(), size))
                .collect();
            for (block, size) in blocks {
                unsafe { pool.free(block, size) };
            }
        });
    });
}

criterion_group!(benches, alloc_free_cycle, mixed_classes);
criterion_main!(benches);
