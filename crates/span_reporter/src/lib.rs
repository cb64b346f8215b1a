//! Span Reporter
//!
//! The span-delivery and traffic-shaping core of a distributed tracing client.
//! Application threads hand finished spans to a [`Reporter`]; the
//! [`BatchingReporter`] queues them without ever blocking the caller, and a
//! single background worker groups them into batches and ships them through a
//! [`SpanSender`].
//!
//! # Components
//!
//! - [`RateLimiter`]: leaky-bucket credit balance for limiting the rate of an
//!   expensive action (sampling decisions, bytes sent)
//! - [`SpanQueue`]: bounded FIFO with non-blocking enqueue and a drain signal
//! - [`BatchingReporter`]: size/time triggered batching, one send in flight,
//!   drop-on-overflow, graceful drain on close
//! - [`NullReporter`], [`InMemoryReporter`], [`LoggingReporter`]: trivial
//!   reporters for tests and fallbacks
//! - [`CompositeReporter`]: fan-out to several reporters
//!
//! Delivery is best-effort: spans are dropped when the queue is full or the
//! reporter is closed, and a failed batch is not retried.
//!
//! # Example
//!
//! ```ignore
//! use span_reporter::{BatchingReporter, JsonFileSender, Reporter, ReporterConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sender = Arc::new(JsonFileSender::new("spans.jsonl"));
//!     let reporter = BatchingReporter::new(ReporterConfig::default(), sender).unwrap();
//!     reporter.set_process("checkout", Default::default(), 0);
//!
//!     reporter.report_span(MySpan::new("GET /cart"));
//!
//!     reporter.close().await.unwrap();
//! }
//! ```

pub mod batching;
pub mod composite;
pub mod config;
pub mod error;
pub mod error_reporter;
mod invariants;
pub mod metrics;
pub mod process;
pub mod queue;
pub mod rate_limiter;
pub mod reporter;
pub mod sender;

// Re-export main types
pub use batching::{BatchingReporter, BatchingReporterBuilder, ReporterState, SEND_ERROR_EVENT};
pub use composite::CompositeReporter;
pub use config::ReporterConfig;
pub use error::{ConfigError, EnqueueError, ReporterError, SendError};
pub use error_reporter::{ErrorReporter, ThrottledErrorReporter};
pub use metrics::{
    Counter, Gauge, InMemoryMetricsFactory, MetricsFactory, NoopMetricsFactory, ReporterMetrics,
};
pub use process::{Process, Tags};
pub use queue::SpanQueue;
pub use rate_limiter::RateLimiter;
pub use reporter::{CloseFuture, InMemoryReporter, LoggingReporter, NullReporter, Reporter};
pub use sender::{Batch, JsonFileSender, NullSender, RateLimitedSender, SpanSender, SpanSenderBoxed};
