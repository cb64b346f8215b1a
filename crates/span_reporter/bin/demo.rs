//! # Span Reporter Demo
//!
//! End-to-end run of the reporting pipeline against a simulated backend.
//!
//! ## Features Demonstrated
//!
//! ### 1. Batching Reporter
//! - Size-triggered batches and a per-batch flush deadline
//! - Bounded queue with drop-on-overflow, never blocking producers
//! - At most one send in flight
//!
//! ### 2. Traffic Shaping
//! - `RateLimitedSender` wrapping the backend with a leaky bucket
//! - Throttled batches surface as send errors, not retries
//!
//! ### 3. Fan-out
//! - `CompositeReporter` feeding the batching reporter plus optional
//!   JSON-lines and logging reporters
//!
//! ### 4. Metrics & Graceful Close
//! - `reporter_spans` counters and the queue length gauge
//! - Close drains everything accepted before it was called
//!
//! ## Running
//!
//! ```bash
//! # Quick mode (4 producers, 50 spans each)
//! cargo run -p span_reporter --bin demo --release -- --quick
//!
//! # Also append every batch to a JSON-lines file
//! cargo run -p span_reporter --bin demo --release -- --json spans.jsonl
//!
//! # Log every span as it is reported
//! RUST_LOG=info cargo run -p span_reporter --bin demo --release -- --verbose
//! ```

use rand::Rng;
use serde::Serialize;
use span_reporter::{
    Batch, BatchingReporter, CompositeReporter, InMemoryMetricsFactory, JsonFileSender,
    LoggingReporter, RateLimitedSender, RateLimiter, Reporter, ReporterConfig, SendError,
    SpanSender, SpanSenderBoxed, Tags, ThrottledErrorReporter,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize)]
struct DemoSpan {
    trace_id: u64,
    span_id: u64,
    operation: &'static str,
    duration_us: u64,
}

const OPERATIONS: [&str; 5] = [
    "GET /cart",
    "POST /checkout",
    "db.query",
    "cache.get",
    "grpc.Inventory/Reserve",
];

#[derive(Default)]
struct BackendStats {
    attempts: AtomicU64,
    spans: AtomicU64,
    failures: AtomicU64,
}

/// A backend that is slow and occasionally refuses a batch.
struct SimulatedBackend {
    failure_rate: f64,
    latency: Duration,
    stats: Arc<BackendStats>,
}

impl SpanSender<DemoSpan> for SimulatedBackend {
    async fn send(&self, batch: Batch<DemoSpan>) -> Result<(), SendError> {
        self.stats.attempts.fetch_add(1, Ordering::Relaxed);
        let fail = rand::thread_rng().gen_bool(self.failure_rate);

        tokio::time::sleep(self.latency).await;

        if fail {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
            return Err(SendError::Transport(format!(
                "simulated backend failure (batch of {} spans)",
                batch.len()
            )));
        }
        self.stats.spans.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated-backend"
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let quick = args.contains(&"--quick".to_string());
    let verbose = args.contains(&"--verbose".to_string());
    let json_path = flag_value(&args, "--json");

    let (num_producers, spans_per_producer) = if quick { (4, 50) } else { (8, 250) };

    println!("Span Reporter Demo");
    println!("   Mode: {}", if quick { "quick" } else { "full" });
    println!("   Producers: {}", num_producers);
    println!("   Spans per producer: {}", spans_per_producer);
    println!();

    // Pipeline: backend <- rate limiter <- batching reporter <- composite
    let stats = Arc::new(BackendStats::default());
    let backend = SimulatedBackend {
        failure_rate: 0.1,
        latency: Duration::from_millis(5),
        stats: Arc::clone(&stats),
    };
    let limiter = RateLimiter::new(2_000.0, 500.0)?;
    let sender: Arc<dyn SpanSenderBoxed<DemoSpan>> =
        Arc::new(RateLimitedSender::new(backend, limiter));

    let metrics = InMemoryMetricsFactory::with_namespace("demo:");
    let error_reporter = Arc::new(ThrottledErrorReporter::new(Duration::from_secs(1)));
    let config = ReporterConfig::default()
        .with_batch_size(25)
        .with_queue_capacity(500)
        .with_flush_interval(Duration::from_millis(50));

    println!("Reporter:");
    println!("   Batch size: {} spans", config.batch_size);
    println!("   Flush interval: {:?}", config.flush_interval);
    println!("   Queue capacity: {}", config.queue_capacity);
    println!("   Rate limit: 2000 spans/s, burst 500");
    println!();

    let batching = BatchingReporter::builder(sender)
        .config(config)
        .metrics_factory(&metrics)
        .error_reporter(error_reporter.clone())
        .build()?;

    let mut reporters: Vec<Box<dyn Reporter<DemoSpan>>> = vec![Box::new(batching)];
    if let Some(path) = &json_path {
        let json: Arc<dyn SpanSenderBoxed<DemoSpan>> = Arc::new(JsonFileSender::new(path.clone()));
        reporters.push(Box::new(BatchingReporter::new(
            ReporterConfig::high_throughput(),
            json,
        )?));
        println!("   Writing batches to {}", path);
    }
    if verbose {
        reporters.push(Box::new(LoggingReporter::new()));
    }

    let reporter = Arc::new(CompositeReporter::new(reporters));
    let mut tags = Tags::new();
    tags.insert("hostname".to_string(), "demo-host".to_string());
    tags.insert("client-version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    reporter.set_process("checkout-service", tags, 64);

    let start = Instant::now();
    let producers: Vec<_> = (0..num_producers)
        .map(|id: u64| {
            let reporter = Arc::clone(&reporter);
            tokio::spawn(async move {
                for seq in 0..spans_per_producer {
                    let span = {
                        let mut rng = rand::thread_rng();
                        DemoSpan {
                            trace_id: rng.gen(),
                            span_id: id << 32 | seq,
                            operation: OPERATIONS[rng.gen_range(0..OPERATIONS.len())],
                            duration_us: rng.gen_range(50..5_000),
                        }
                    };
                    reporter.report_span(span);
                    if seq % 10 == 0 {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.await?;
    }
    let generation_time = start.elapsed();
    println!("All producers finished in {:?}", generation_time);

    println!("Closing reporter...");
    if let Err(e) = reporter.close().await {
        eprintln!("   close failed: {}", e);
    }
    let total_time = start.elapsed();

    let counter = |name: &str| metrics.counter(name).unwrap_or(0);
    let total = num_producers * spans_per_producer;
    println!();
    println!("Results");
    println!("   Total time:            {:>10.2?}", total_time);
    println!("   Spans reported:        {:>10}", total);
    println!("   Spans sent (ok):       {:>10}", counter("demo:reporter_spans.result_ok"));
    println!("   Spans failed (err):    {:>10}", counter("demo:reporter_spans.result_err"));
    println!("   Spans dropped:         {:>10}", counter("demo:reporter_spans.result_dropped"));
    println!(
        "   Final queue length:    {:>10}",
        metrics.gauge("demo:reporter_queue_length").unwrap_or(0)
    );
    println!("   Backend sends:         {:>10}", stats.attempts.load(Ordering::Relaxed));
    println!("   Backend failures:      {:>10}", stats.failures.load(Ordering::Relaxed));
    println!("   Backend spans stored:  {:>10}", stats.spans.load(Ordering::Relaxed));
    println!(
        "   Errors logged:         {:>10} ({} suppressed)",
        error_reporter.logged(),
        error_reporter.suppressed()
    );

    Ok(())
}
