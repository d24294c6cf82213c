use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use queuepilot::{ControlCommand, Controller, MetricsSnapshot, Rate, RateLimiter, Ring};
use std::hint::black_box;
use std::time::{Duration, Instant};

fn benchmark_rate_limiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limiter");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("claim_single_permit", |b| {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(Rate::per_second(1_000_000.0).unwrap(), start);
        let mut now = start;

        b.iter(|| {
            now += limiter.claim(black_box(1), now);
            black_box(now)
        });
    });

    group.bench_function("claim_with_rate_change", |b| {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(Rate::per_second(1_000.0).unwrap(), start);
        let rates = [
            Rate::per_second(500.0).unwrap(),
            Rate::per_second(2_000.0).unwrap(),
        ];
        let mut counter = 0usize;

        b.iter(|| {
            counter += 1;
            limiter.set_rate(rates[counter % 2]);
            black_box(limiter.claim(1, start))
        });
    });

    group.finish();
}

fn benchmark_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_pop", |b| {
        let mut ring = Ring::new(256);
        let mut item = 0u64;

        b.iter(|| {
            item += 1;
            let _ = ring.try_push(black_box(item));
            black_box(ring.try_pop())
        });
    });

    group.finish();
}

fn benchmark_controller_and_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_path");

    group.bench_function("controller_step", |b| {
        let controller = Controller::new(1.0).unwrap();
        let consumer = Rate::per_second(10.0).unwrap();
        let producer = Rate::per_second(12.0).unwrap();

        b.iter(|| black_box(controller.step(producer, consumer, black_box(40), black_box(32))));
    });

    group.bench_function("parse_control_command", |b| {
        b.iter(|| black_box(ControlCommand::parse(black_box("5:_:100"))));
    });

    group.bench_function("encode_telemetry", |b| {
        let snapshot = MetricsSnapshot {
            producer_rate: 9.0,
            produced_total: 123_456,
            consumed_total: 123_400,
            occupancy: 56,
            queue_threshold: 64,
        };
        b.iter(|| black_box(snapshot.encode()));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_rate_limiter,
    benchmark_ring,
    benchmark_controller_and_protocol
);
criterion_main!(benches);
