//! Performance benchmarks for queues and hubs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use courier::{Hub, Queue};
use std::thread;

/// Publish cost should stay flat as subscribers are added.
fn bench_publish_vs_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("hub_publish");

    for subscribers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &count| {
                let hub = Hub::sliding(1024).unwrap();
                let _subs: Vec<_> = (0..count).map(|_| hub.subscribe()).collect();

                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    black_box(hub.publish(i).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Single-threaded offer/take round trip.
fn bench_queue_offer_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_offer_take");

    for capacity in [16, 1024] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &cap| {
                let queue = Queue::bounded(cap).unwrap();
                b.iter(|| {
                    queue.offer(black_box(1u64)).unwrap();
                    black_box(queue.take().unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Producer and consumer on separate threads through a small buffer.
fn bench_queue_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_handoff");
    let items = 10_000u64;

    group.bench_function("bounded_64", |b| {
        b.iter(|| {
            let queue = Queue::bounded(64).unwrap();
            let producer = {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..items {
                        queue.offer(i).unwrap();
                    }
                })
            };
            for _ in 0..items {
                black_box(queue.take().unwrap());
            }
            producer.join().unwrap();
        });
    });

    group.finish();
}

/// Each subscriber drains its backlog; truncation follows the slowest.
fn bench_subscriber_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscriber_drain");

    for backlog in [100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("backlog", backlog),
            &backlog,
            |b, &n| {
                let hub = Hub::unbounded();
                let subs: Vec<_> = (0..8).map(|_| hub.subscribe()).collect();
                b.iter(|| {
                    hub.publish_all(0..n as u64).unwrap();
                    for sub in &subs {
                        black_box(sub.take_all().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_vs_subscribers,
    bench_queue_offer_take,
    bench_queue_handoff,
    bench_subscriber_drain,
);
criterion_main!(benches);
