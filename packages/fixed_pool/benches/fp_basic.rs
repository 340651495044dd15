//! Basic benchmarks for the `fixed_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use fixed_pool::FixedPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = [u64; 8];
const TEST_VALUE: TestItem = [1024; 8];
const CAPACITY: usize = 1024;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_basic");

    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    FixedPool::with_value(CAPACITY, TEST_VALUE).unwrap(),
                ));
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_release", |b| {
        let mut pool = FixedPool::with_value(CAPACITY, TEST_VALUE).unwrap();

        b.iter(|| {
            drop(black_box(pool.acquire_mut()));
        });
    });

    group.bench_function("acquire_shared_release", |b| {
        let mut pool = FixedPool::with_value(CAPACITY, TEST_VALUE).unwrap();

        b.iter(|| {
            drop(black_box(pool.acquire()));
        });
    });

    group.bench_function("drain", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| FixedPool::with_value(CAPACITY, TEST_VALUE).unwrap())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                let handles = iter::from_fn(|| pool.acquire_mut()).collect::<Vec<_>>();
                black_box(&handles);
            }

            start.elapsed()
        });
    });

    group.bench_function("clone_shared", |b| {
        let mut pool = FixedPool::with_value(CAPACITY, TEST_VALUE).unwrap();
        let handle = pool.acquire().unwrap();

        b.iter(|| {
            drop(black_box(handle.clone()));
        });
    });

    group.finish();
}
