use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use std::sync::Arc;

use siltdb::storage::buffer::BufferPool;

const PAGE_SIZE: usize = 4096;

// Create a pool over a temporary data directory
fn create_bench_buffer_pool(page_count: usize) -> Arc<BufferPool> {
    let dir = tempfile::TempDir::new().unwrap();
    let pool = Arc::new(BufferPool::new(PAGE_SIZE, page_count, dir.path()).unwrap());

    // Keep the temp directory alive
    std::mem::forget(dir);

    pool
}

// Seed `count` pages with recognizable contents
fn populate_pages(pool: &BufferPool, count: u64) -> Vec<u64> {
    let mut page_ids = Vec::new();
    for page_id in 0..count {
        let mut handle = pool.fix_page(page_id, true).unwrap();
        handle.data_mut().fill((page_id % 251) as u8);
        pool.unfix_page(handle, true);
        page_ids.push(page_id);
    }
    page_ids
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    // Test with different buffer pool sizes
    for size in [10u64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential_fix", size), size, |b, &size| {
            let pool = create_bench_buffer_pool(size as usize);
            let page_ids = populate_pages(&pool, size);

            // Benchmark sequential access pattern
            b.iter(|| {
                for &page_id in &page_ids {
                    let handle = pool.fix_page(page_id, false).unwrap();
                    let _first = handle.data()[0];
                    pool.unfix_page(handle, false);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_fix", size), size, |b, &size| {
            let pool = create_bench_buffer_pool(size as usize);
            let page_ids = populate_pages(&pool, size);

            // Create random access pattern
            let mut rng = rand::thread_rng();
            let random_indices: Vec<usize> = (0..size as usize)
                .map(|_| rng.gen_range(0..size as usize))
                .collect();

            // Benchmark random access pattern
            b.iter(|| {
                for &idx in &random_indices {
                    let handle = pool.fix_page(page_ids[idx], false).unwrap();
                    let _first = handle.data()[0];
                    pool.unfix_page(handle, false);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("evicting_fix", size), size, |b, &size| {
            // Half as many slots as pages, so fixes keep evicting.
            let pool = create_bench_buffer_pool((size / 2).max(1) as usize);
            let page_ids = populate_pages(&pool, size);

            b.iter(|| {
                for &page_id in &page_ids {
                    let handle = pool.fix_page(page_id, false).unwrap();
                    let _first = handle.data()[0];
                    pool.unfix_page(handle, false);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark);
criterion_main!(benches);
