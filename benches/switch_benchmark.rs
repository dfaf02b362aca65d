/*!
 * Thread Switch Benchmarks
 *
 * Measure yield round trips, thread lifecycle and lock overhead
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::cell::Cell;
use std::rc::Rc;
use uthreads::{Lock, SchedulerConfig};

fn start() {
    uthreads::init_with(SchedulerConfig {
        max_threads: 128,
        stack_size: 64 * 1024,
        preemption: None,
    })
    .unwrap();
}

fn stop(flag: &Cell<bool>) {
    flag.set(true);
    while uthreads::yield_now().is_ok() {}
    uthreads::shutdown().unwrap();
}

fn bench_yield_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("yield_round_trip");

    for peers in [1u32, 4, 16, 64] {
        start();
        let done = Rc::new(Cell::new(false));
        for _ in 0..peers {
            let done = done.clone();
            uthreads::create(move || {
                while !done.get() {
                    uthreads::yield_now().ok();
                }
            })
            .unwrap();
        }

        // One iteration runs every peer once and comes back
        group.bench_with_input(BenchmarkId::from_parameter(peers), &peers, |b, _| {
            b.iter(|| black_box(uthreads::yield_now().unwrap()));
        });

        stop(&done);
    }

    group.finish();
}

fn bench_create_and_exit(c: &mut Criterion) {
    start();
    c.bench_function("create_and_exit", |b| {
        b.iter(|| {
            let tid = uthreads::create(|| {}).unwrap();
            uthreads::yield_now().unwrap();
            black_box(tid)
        });
    });
    uthreads::shutdown().unwrap();
}

fn bench_uncontended_lock(c: &mut Criterion) {
    start();
    let lock = Lock::new();
    c.bench_function("uncontended_lock", |b| {
        b.iter(|| {
            lock.acquire().unwrap();
            lock.release().unwrap();
        });
    });
    drop(lock);
    uthreads::shutdown().unwrap();
}

fn bench_no_waiter_wakeup(c: &mut Criterion) {
    start();
    let queue = uthreads::WaitQueue::new();
    c.bench_function("no_waiter_wakeup", |b| {
        b.iter(|| black_box(uthreads::wakeup(&queue, true).unwrap()));
    });
    drop(queue);
    uthreads::shutdown().unwrap();
}

criterion_group!(
    benches,
    bench_yield_round_trip,
    bench_create_and_exit,
    bench_uncontended_lock,
    bench_no_waiter_wakeup
);

criterion_main!(benches);
