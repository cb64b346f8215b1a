//! Error types for span_reporter operations.

use thiserror::Error;

/// Errors raised while validating reporter or rate limiter settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `batch_size` must be at least one.
    #[error("batch_size must be >= 1, got {0}")]
    InvalidBatchSize(usize),

    /// `queue_capacity` must be at least one.
    #[error("queue_capacity must be >= 1, got {0}")]
    InvalidQueueCapacity(usize),

    /// A configured flush interval must be non-zero.
    #[error("flush_interval must be greater than zero when enabled")]
    ZeroFlushInterval,

    /// `credits_per_second` must be a finite, positive number.
    #[error("credits_per_second must be > 0, got {0}")]
    InvalidCreditRate(f64),

    /// `max_balance` must be a finite, positive number.
    #[error("max_balance must be > 0, got {0}")]
    InvalidMaxBalance(f64),

    /// The reporter worker needs a Tokio runtime to be spawned on.
    #[error("no Tokio runtime available to spawn the reporter worker")]
    NoRuntime,
}

/// Error types for span send operations.
///
/// The reporter treats every variant the same way: the batch is counted as
/// failed, handed to the error reporter and not retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Transport-layer error (network, HTTP, file I/O)
    #[error("transport error: {0}")]
    Transport(String),
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The sender's throughput budget is exhausted.
    #[error("send rejected by rate limiter")]
    RateLimited,
    /// The send future panicked.
    #[error("sender panicked: {0}")]
    Panicked(String),
}

/// Rejection returned by [`SpanQueue::try_enqueue`](crate::SpanQueue::try_enqueue).
///
/// Both variants hand the item back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError<T> {
    /// The queue holds `capacity` items.
    #[error("span queue is full")]
    Full(T),
    /// The queue has been closed for new items.
    #[error("span queue is closed")]
    Closed(T),
}

impl<T> EnqueueError<T> {
    /// Returns the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }

    /// Returns `true` if the item was rejected because the queue was full.
    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

/// Errors surfaced by [`Reporter::close`](crate::Reporter::close).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReporterError {
    /// The consumer task stopped before the queue was drained.
    #[error("reporter worker terminated before draining")]
    WorkerTerminated,
    /// One or more children of a composite reporter failed to close.
    #[error("{} reporter(s) failed to close", .0.len())]
    Composite(Vec<ReporterError>),
}
