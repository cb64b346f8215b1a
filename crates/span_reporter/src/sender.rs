//! Sender capability: the transport that ships a batch to the collector.
//!
//! The reporter does not care how a batch travels; it awaits the returned
//! future and treats any `Err` the same way. Senders own their timeouts: a
//! future that never resolves stalls the reporter pipeline.

use crate::error::SendError;
use crate::process::Process;
use crate::rate_limiter::RateLimiter;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// A group of spans sent in one transport call.
#[derive(Debug, Clone)]
pub struct Batch<S> {
    /// Process descriptor current when the batch was cut (`None` if unset)
    pub process: Option<Arc<Process>>,
    /// Spans in acceptance order
    pub spans: Vec<S>,
}

impl<S> Batch<S> {
    pub fn new(process: Option<Arc<Process>>, spans: Vec<S>) -> Self {
        Self { process, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Trait for shipping span batches to a collector.
///
/// Uses native async fn in traits instead of `#[async_trait]`.
///
/// # Note on Object Safety
///
/// This trait uses `impl Future` return types which are not object-safe.
/// For dynamic dispatch, use `Arc<dyn SpanSenderBoxed<S>>`.
pub trait SpanSender<S>: Send + Sync {
    /// Sends a batch of spans.
    fn send(&self, batch: Batch<S>) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Returns the sender name for debugging.
    fn name(&self) -> &str;
}

/// Object-safe version of `SpanSender` for dynamic dispatch.
pub trait SpanSenderBoxed<S>: Send + Sync {
    /// Sends a batch of spans (boxed future for object safety).
    fn send_boxed(
        &self,
        batch: Batch<S>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>>;

    /// Returns the sender name for debugging.
    fn name(&self) -> &str;
}

/// Blanket implementation: any SpanSender can be used as SpanSenderBoxed
impl<S: 'static, T: SpanSender<S>> SpanSenderBoxed<S> for T {
    fn send_boxed(
        &self,
        batch: Batch<S>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>> {
        Box::pin(self.send(batch))
    }

    fn name(&self) -> &str {
        SpanSender::name(self)
    }
}

/// Sender that discards every batch (for benchmarking)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSender;

impl<S: Send + 'static> SpanSender<S> for NullSender {
    async fn send(&self, _batch: Batch<S>) -> Result<(), SendError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[derive(Serialize)]
struct ProcessRecord<'a> {
    service_name: &'a str,
    tags: std::collections::BTreeMap<&'a str, std::borrow::Cow<'a, str>>,
}

#[derive(Serialize)]
struct BatchRecord<'a, S> {
    process: Option<ProcessRecord<'a>>,
    spans: &'a [S],
}

/// Writes each batch as one JSON line appended to a file.
///
/// Process tag values are truncated to the process' `max_tag_value_length`.
pub struct JsonFileSender {
    file_path: String,
}

impl JsonFileSender {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

pub(crate) fn encode_batch<S: Serialize>(batch: &Batch<S>) -> Result<Vec<u8>, SendError> {
    let record = BatchRecord {
        process: batch.process.as_deref().map(|p| ProcessRecord {
            service_name: &p.service_name,
            tags: p.truncated_tags(),
        }),
        spans: &batch.spans,
    };
    let mut line =
        serde_json::to_vec(&record).map_err(|e| SendError::Serialization(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

impl<S: Serialize + Send + Sync + 'static> SpanSender<S> for JsonFileSender {
    async fn send(&self, batch: Batch<S>) -> Result<(), SendError> {
        use tokio::io::AsyncWriteExt;

        let line = encode_batch(&batch)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        file.write_all(&line)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))
    }

    fn name(&self) -> &str {
        "json_file"
    }
}

/// A sender wrapper that shapes throughput with a leaky bucket.
///
/// Each batch costs one credit per span. Batches the bucket cannot afford
/// are rejected with [`SendError::RateLimited`] instead of being delayed.
pub struct RateLimitedSender<T> {
    inner: T,
    limiter: Mutex<RateLimiter>,
}

impl<T> RateLimitedSender<T> {
    pub fn new(inner: T, limiter: RateLimiter) -> Self {
        Self {
            inner,
            limiter: Mutex::new(limiter),
        }
    }

    fn admit(&self, spans: usize) -> bool {
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check_credit(spans as f64)
    }
}

impl<S: Send + 'static, T: SpanSender<S>> SpanSender<S> for RateLimitedSender<T> {
    async fn send(&self, batch: Batch<S>) -> Result<(), SendError> {
        if !self.admit(batch.len()) {
            return Err(SendError::RateLimited);
        }
        self.inner.send(batch).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Test sender that records every batch it receives
#[cfg(test)]
pub(crate) struct RecordingSender<S> {
    batches: Mutex<Vec<Vec<S>>>,
}

#[cfg(test)]
impl<S: Clone> RecordingSender<S> {
    pub(crate) fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<S>> {
        self.batches.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl<S: Clone + Send + 'static> SpanSender<S> for RecordingSender<S> {
    async fn send(&self, batch: Batch<S>) -> Result<(), SendError> {
        self.batches.lock().unwrap().push(batch.spans);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
