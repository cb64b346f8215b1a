//! The reporting contract and its trivial implementations.
//!
//! Every reporter accepts spans synchronously and never blocks the caller.
//! [`Reporter::close`] returns a boxed future so reporters can be held as
//! `Box<dyn Reporter<S>>`, e.g. inside a [`CompositeReporter`](crate::CompositeReporter).

use crate::error::ReporterError;
use crate::process::{Process, Tags};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// Future returned by [`Reporter::close`].
pub type CloseFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReporterError>> + Send + 'a>>;

/// Receives finished spans and ships them somewhere.
pub trait Reporter<S>: Send + Sync {
    /// Hands a finished span to the reporter. Never blocks.
    fn report_span(&self, span: S);

    /// Sets the process descriptor attached to future batches.
    ///
    /// `max_length` bounds individual tag values (0 = unlimited).
    fn set_process(&self, service_name: &str, tags: Tags, max_length: usize);

    /// Flushes accepted spans and stops the reporter.
    ///
    /// Shutdown starts when `close` is called; the returned future resolves
    /// once it has finished.
    fn close(&self) -> CloseFuture<'_>;
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl NullReporter {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Reporter<S> for NullReporter {
    fn report_span(&self, _span: S) {}

    fn set_process(&self, _service_name: &str, _tags: Tags, _max_length: usize) {}

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Reporter that keeps every span in memory (for tests).
#[derive(Debug)]
pub struct InMemoryReporter<S> {
    spans: Mutex<Vec<S>>,
    process: Mutex<Option<Process>>,
}

impl<S> Default for InMemoryReporter<S> {
    fn default() -> Self {
        Self {
            spans: Mutex::new(Vec::new()),
            process: Mutex::new(None),
        }
    }
}

impl<S: Clone> InMemoryReporter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reported spans, in reporting order.
    pub fn get_spans(&self) -> Vec<S> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn process(&self) -> Option<Process> {
        self.process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: Send> Reporter<S> for InMemoryReporter<S> {
    fn report_span(&self, span: S) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }

    fn set_process(&self, service_name: &str, tags: Tags, max_length: usize) {
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Process::new(service_name, tags, max_length));
    }

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Reporter that writes one `tracing` record per span.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl<S: Debug> Reporter<S> for LoggingReporter {
    fn report_span(&self, span: S) {
        tracing::info!(span = ?span, "Reporting span");
    }

    fn set_process(&self, service_name: &str, tags: Tags, max_length: usize) {
        tracing::debug!(service_name, ?tags, max_length, "Process set");
    }

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}
