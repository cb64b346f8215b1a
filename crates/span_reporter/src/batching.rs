//! Batching reporter: bounded queue, single worker, size/time triggered sends.
//!
//! ```text
//!  report_span() ──try_enqueue──► SpanQueue ──dequeue──► Worker ──send──► SpanSender
//!        │                          (bounded)            pending batch       (one at a time)
//!        └─ full / closed ─► reporter_spans.result_dropped
//! ```
//!
//! The worker awaits every send before dequeuing again, so at most one batch
//! is in flight. A slow collector therefore backs up the queue and new spans
//! are dropped instead of buffered without bound.
//!
//! # Lifecycle
//!
//! `Open` → `Closing` → `Closed`. [`Reporter::close`] closes the queue; the
//! worker keeps draining what was accepted (in `batch_size` chunks), sends the
//! last partial batch, retires everything and stops. Dropping the reporter
//! without calling `close` starts the same drain in the background.

use crate::config::ReporterConfig;
use crate::error::{ConfigError, ReporterError, SendError};
use crate::error_reporter::{ErrorReporter, ThrottledErrorReporter};
#[cfg(debug_assertions)]
use crate::invariants::{debug_assert_batch_within_limit, debug_assert_drained};
use crate::metrics::{MetricsFactory, ReporterMetrics};
use crate::process::{Process, Tags};
use crate::queue::SpanQueue;
use crate::reporter::{CloseFuture, Reporter};
use crate::sender::{Batch, SpanSenderBoxed};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Event name handed to the error reporter when a send fails.
pub const SEND_ERROR_EVENT: &str = "reporter_spans.result_err";

/// Lifecycle state of a [`BatchingReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Accepting spans.
    Open,
    /// `close` was called; accepted spans are being drained.
    Closing,
    /// Drained and stopped. Terminal.
    Closed,
}

/// State shared between reporting callers and the worker.
struct Shared<S> {
    queue: SpanQueue<S>,
    process: RwLock<Option<Arc<Process>>>,
    metrics: ReporterMetrics,
}

impl<S> Shared<S> {
    fn process(&self) -> Option<Arc<Process>> {
        self.process
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Builder for [`BatchingReporter`].
pub struct BatchingReporterBuilder<S> {
    sender: Arc<dyn SpanSenderBoxed<S>>,
    config: ReporterConfig,
    metrics: ReporterMetrics,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl<S: Send + 'static> BatchingReporterBuilder<S> {
    pub fn config(mut self, config: ReporterConfig) -> Self {
        self.config = config;
        self
    }

    /// Creates the reporter's counters and gauge from `factory`.
    pub fn metrics_factory(mut self, factory: &dyn MetricsFactory) -> Self {
        self.metrics = ReporterMetrics::new(factory);
        self
    }

    pub fn error_reporter(mut self, error_reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = error_reporter;
        self
    }

    /// Validates the configuration and spawns the worker on the current
    /// Tokio runtime.
    pub fn build(self) -> Result<BatchingReporter<S>, ConfigError> {
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let shared = Arc::new(Shared {
            queue: SpanQueue::new(self.config.queue_capacity),
            process: RwLock::new(None),
            metrics: self.metrics,
        });
        let (done_tx, done_rx) = watch::channel(false);

        let worker = Worker {
            shared: Arc::clone(&shared),
            sender: self.sender,
            error_reporter: self.error_reporter,
            batch_size: self.config.batch_size,
            flush_interval: self.config.flush_interval,
        };
        runtime.spawn(worker.run(done_tx));

        Ok(BatchingReporter {
            shared,
            done: done_rx,
        })
    }
}

/// Reporter that batches spans and ships them from a background worker.
///
/// `report_span` only enqueues (or drops) and returns immediately; it is safe
/// to call from any thread.
pub struct BatchingReporter<S> {
    shared: Arc<Shared<S>>,
    done: watch::Receiver<bool>,
}

impl<S: Send + 'static> BatchingReporter<S> {
    /// Starts a reporter with default metrics and error reporting.
    pub fn new(
        config: ReporterConfig,
        sender: Arc<dyn SpanSenderBoxed<S>>,
    ) -> Result<Self, ConfigError> {
        Self::builder(sender).config(config).build()
    }

    pub fn builder(sender: Arc<dyn SpanSenderBoxed<S>>) -> BatchingReporterBuilder<S> {
        BatchingReporterBuilder {
            sender,
            config: ReporterConfig::default(),
            metrics: ReporterMetrics::default(),
            error_reporter: Arc::new(ThrottledErrorReporter::default()),
        }
    }
}

impl<S> BatchingReporter<S> {
    pub fn state(&self) -> ReporterState {
        if *self.done.borrow() {
            ReporterState::Closed
        } else if self.shared.queue.is_closed() {
            ReporterState::Closing
        } else {
            ReporterState::Open
        }
    }

    /// Spans waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Accepted spans not yet sent (queued, pending in a batch or in flight).
    pub fn unfinished(&self) -> usize {
        self.shared.queue.unfinished()
    }

    pub fn process(&self) -> Option<Arc<Process>> {
        self.shared.process()
    }
}

impl<S: Send + 'static> Reporter<S> for BatchingReporter<S> {
    fn report_span(&self, span: S) {
        if let Err(err) = self.shared.queue.try_enqueue(span) {
            self.shared.metrics.spans_dropped.increment(1);
            tracing::trace!(reason = %err, "span dropped");
        }
    }

    fn set_process(&self, service_name: &str, tags: Tags, max_length: usize) {
        let process = Arc::new(Process::new(service_name, tags, max_length));
        *self
            .shared
            .process
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(process);
    }

    fn close(&self) -> CloseFuture<'_> {
        self.shared.queue.close();
        let mut done = self.done.clone();

        Box::pin(async move {
            while !*done.borrow_and_update() {
                if done.changed().await.is_err() {
                    return Err(ReporterError::WorkerTerminated);
                }
            }
            self.shared.queue.drained().await;
            Ok(())
        })
    }
}

impl<S> Drop for BatchingReporter<S> {
    fn drop(&mut self) {
        // Lets the worker drain and exit instead of waiting forever
        self.shared.queue.close();
    }
}

/// The single consumer of the span queue.
struct Worker<S> {
    shared: Arc<Shared<S>>,
    sender: Arc<dyn SpanSenderBoxed<S>>,
    error_reporter: Arc<dyn ErrorReporter>,
    batch_size: usize,
    flush_interval: Option<Duration>,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<S: Send + 'static> Worker<S> {
    async fn run(self, done: watch::Sender<bool>) {
        let mut pending: Vec<S> = Vec::with_capacity(self.batch_size);
        // Armed when the first span lands in an empty batch
        let mut deadline: Option<Instant> = None;
        let mut batches: u64 = 0;

        loop {
            tokio::select! {
                biased;

                () = sleep_until(deadline), if deadline.is_some() => {
                    deadline = None;
                    if self.flush(&mut pending).await {
                        batches += 1;
                    }
                }

                item = self.shared.queue.dequeue() => {
                    let Some(span) = item else {
                        // Queue closed and fully drained
                        break;
                    };
                    if pending.is_empty() {
                        deadline = self.flush_interval.map(|interval| Instant::now() + interval);
                    }
                    pending.push(span);

                    #[cfg(debug_assertions)]
                    debug_assert_batch_within_limit!(pending.len(), self.batch_size);

                    if pending.len() >= self.batch_size {
                        deadline = None;
                        if self.flush(&mut pending).await {
                            batches += 1;
                        }
                    }
                }
            }
        }

        if self.flush(&mut pending).await {
            batches += 1;
        }

        #[cfg(debug_assertions)]
        debug_assert_drained!(self.shared.queue.len(), pending.len());

        tracing::info!(batches, sender = self.sender.name(), "span reporter worker exited");
        done.send_replace(true);
    }

    /// Sends whatever is pending and waits for the outcome.
    ///
    /// Returns `false` without sending if nothing is pending.
    async fn flush(&self, pending: &mut Vec<S>) -> bool {
        if pending.is_empty() {
            return false;
        }
        let spans = std::mem::replace(pending, Vec::with_capacity(self.batch_size));
        let count = spans.len();
        let batch = Batch::new(self.shared.process(), spans);

        let sender = &self.sender;
        let started = std::panic::catch_unwind(AssertUnwindSafe(move || sender.send_boxed(batch)));
        let result = match started {
            Ok(send) => AssertUnwindSafe(send).catch_unwind().await.unwrap_or_else(|payload| {
                Err(SendError::Panicked(panic_message(payload.as_ref())))
            }),
            Err(payload) => Err(SendError::Panicked(panic_message(payload.as_ref()))),
        };

        let metrics = &self.shared.metrics;
        match result {
            Ok(()) => {
                metrics.spans_ok.increment(count as u64);
                tracing::debug!(spans = count, "batch sent");
            }
            Err(err) => {
                metrics.spans_err.increment(count as u64);
                tracing::debug!(spans = count, error = %err, "batch send failed");
                self.report_error(&err);
            }
        }

        self.shared.queue.mark_done(count);
        metrics.queue_length.update(self.shared.queue.len() as i64);
        true
    }

    fn report_error(&self, err: &SendError) {
        let error_reporter = &self.error_reporter;
        let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
            error_reporter.error(SEND_ERROR_EVENT, 1, err);
        }));
        if let Err(payload) = reported {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "error reporter panicked while handling a send failure"
            );
        }
    }
}
