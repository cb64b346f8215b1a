//! Benchmarks for the hot paths of span reporting.
//!
//! - `queue`: enqueue/dequeue cycles on the bounded span queue
//! - `rate_limiter`: credit checks on a saturated and a starved bucket
//! - `reporter`: `report_span` plus close on a batching reporter
//!
//! Run with: cargo bench -p span_reporter --bench report_span

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use span_reporter::{
    BatchingReporter, NullSender, RateLimiter, Reporter, ReporterConfig, SpanQueue,
    SpanSenderBoxed,
};
use std::sync::Arc;

const SPAN_COUNT: u64 = 10_000;

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(SPAN_COUNT));

    group.bench_function("enqueue_dequeue", |b| {
        let queue = SpanQueue::<u64>::new(1024);

        b.iter(|| {
            let mut received = 0u64;
            for i in 0..SPAN_COUNT {
                if queue.try_enqueue(black_box(i)).is_err() {
                    while let Some(v) = queue.try_dequeue() {
                        black_box(v);
                        received += 1;
                    }
                    queue.mark_done(queue.unfinished());
                    let _ = queue.try_enqueue(i);
                }
            }
            while let Some(v) = queue.try_dequeue() {
                black_box(v);
                received += 1;
            }
            queue.mark_done(queue.unfinished());
            received
        });
    });

    group.bench_function("enqueue_full", |b| {
        let queue = SpanQueue::<u64>::new(1);
        let _ = queue.try_enqueue(0);

        b.iter(|| {
            for i in 0..SPAN_COUNT {
                black_box(queue.try_enqueue(black_box(i)).is_err());
            }
        });
    });

    group.finish();
}

fn bench_rate_limiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limiter");
    group.throughput(Throughput::Elements(SPAN_COUNT));

    group.bench_function("check_credit_saturated", |b| {
        let mut limiter = RateLimiter::new(1e12, 1e12).unwrap();
        b.iter(|| {
            for _ in 0..SPAN_COUNT {
                black_box(limiter.check_credit(black_box(1.0)));
            }
        });
    });

    group.bench_function("check_credit_starved", |b| {
        let mut limiter = RateLimiter::new(0.001, 1.0).unwrap();
        b.iter(|| {
            for _ in 0..SPAN_COUNT {
                black_box(limiter.check_credit(black_box(1.0)));
            }
        });
    });

    group.finish();
}

fn bench_reporter(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("reporter");
    group.throughput(Throughput::Elements(SPAN_COUNT));

    group.bench_function("report_and_close", |b| {
        b.to_async(&rt).iter(|| async {
            let sender: Arc<dyn SpanSenderBoxed<u64>> = Arc::new(NullSender);
            let reporter = BatchingReporter::new(
                ReporterConfig::high_throughput().with_queue_capacity(SPAN_COUNT as usize),
                sender,
            )
            .unwrap();
            for i in 0..SPAN_COUNT {
                reporter.report_span(black_box(i));
            }
            reporter.close().await.unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_rate_limiter, bench_reporter);
criterion_main!(benches);
