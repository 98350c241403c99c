//! Basic benchmarks for the `chunk_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use chunk_pool::ChunkPool;
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const CHUNKS_PER_BLOCK: usize = 128;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("chunk_pool_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(ChunkPool::<TestItem, CHUNKS_PER_BLOCK>::new()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_first");
    group.bench_function("allocate_first", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(ChunkPool::<TestItem, CHUNKS_PER_BLOCK>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate().unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_second");
    group.bench_function("allocate_second", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(ChunkPool::<TestItem, CHUNKS_PER_BLOCK>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            // Pre-warm each pool so the first block already exists.
            for pool in &mut pools {
                _ = pool.allocate().unwrap();
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate().unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_deallocate");
    group.bench_function("allocate_deallocate", |b| {
        b.iter_custom(|iters| {
            let mut pool = ChunkPool::<TestItem, CHUNKS_PER_BLOCK>::new();

            // Pre-warm so we measure the steady state without block acquisition.
            let warm = pool.allocate().unwrap();
            // SAFETY: Came from this pool, never used.
            unsafe {
                pool.deallocate(warm);
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let chunk = black_box(pool.allocate().unwrap());

                // SAFETY: Came from this pool, never used.
                unsafe {
                    pool.deallocate(chunk);
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("fill_block");
    group.bench_function("fill_block", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let mut pool = ChunkPool::<TestItem, CHUNKS_PER_BLOCK>::new();

                for _ in 0..CHUNKS_PER_BLOCK {
                    _ = black_box(pool.allocate().unwrap());
                }

                drop(pool);
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("vs_box");
    group.bench_function("vs_box", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Box::new(black_box(TestItem::MAX))));
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
