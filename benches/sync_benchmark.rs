/*!
 * Coordination Primitives Benchmarks
 *
 * Compare park and spin strategies across channels, locks and barriers
 */

use coord_kit::{Barrier, Channel, Lock, Selector, StrategyType, SyncConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn configs() -> [SyncConfig; 2] {
    [
        SyncConfig::park(),
        SyncConfig {
            strategy: StrategyType::SpinWait,
            spin_duration: Duration::from_micros(10),
            max_spins: 100,
        },
    ]
}

fn bench_rendezvous_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendezvous_latency");

    for config in configs() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", config.strategy)),
            &config,
            |b, config| {
                b.iter(|| {
                    let ch = Channel::with_config(0, config.clone());
                    let rx = ch.clone();
                    let handle = thread::spawn(move || rx.receive());

                    ch.send(black_box(1u64)).unwrap();
                    handle.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_channel_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_throughput");

    for capacity in [0, 1, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let ch = Channel::bounded(capacity);
                    let tx = ch.sender();
                    let producer = thread::spawn(move || {
                        for i in 0..1000u64 {
                            tx.send(i).unwrap();
                        }
                        tx.close().unwrap();
                    });

                    let sum: u64 = ch.iter().sum();
                    producer.join().unwrap();
                    black_box(sum);
                });
            },
        );
    }

    group.finish();
}

fn bench_lock_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_contention");

    for workers in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                b.iter(|| {
                    let lock = Arc::new(Lock::new(0u64));
                    let handles: Vec<_> = (0..workers)
                        .map(|_| {
                            let lock = lock.clone();
                            thread::spawn(move || {
                                for _ in 0..100 {
                                    lock.with(|n| *n += 1);
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                    black_box(*lock.lock());
                });
            },
        );
    }

    group.finish();
}

fn bench_barrier_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("barrier_release");

    for workers in [1, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                b.iter(|| {
                    let barrier = Arc::new(Barrier::new(workers));
                    for _ in 0..workers {
                        let barrier = barrier.clone();
                        thread::spawn(move || barrier.done());
                    }
                    barrier.wait();
                });
            },
        );
    }

    group.finish();
}

fn bench_select_ready(c: &mut Criterion) {
    let first = Channel::bounded(1);
    let second = Channel::bounded(1);

    c.bench_function("select_two_ready", |b| {
        b.iter(|| {
            if first.is_empty() {
                first.send(1u32).unwrap();
            }
            if second.is_empty() {
                second.send(2u32).unwrap();
            }
            let outcome = Selector::new()
                .recv(&first, |v| {
                    black_box(v);
                })
                .recv(&second, |v| {
                    black_box(v);
                })
                .select();
            black_box(outcome).ok();
        });
    });
}

criterion_group!(
    benches,
    bench_rendezvous_latency,
    bench_channel_throughput,
    bench_lock_contention,
    bench_barrier_release,
    bench_select_ready,
);

criterion_main!(benches);
