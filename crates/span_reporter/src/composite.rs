//! Fan-out over several reporters.

use crate::error::ReporterError;
use crate::process::Tags;
use crate::reporter::{CloseFuture, Reporter};
use futures_util::future::join_all;

/// Forwards every operation to each child reporter, in order.
///
/// `close` starts every child's close at once and resolves when all of them
/// have resolved. Child failures are collected into
/// [`ReporterError::Composite`]; one failing child does not stop the others
/// from being awaited.
pub struct CompositeReporter<S> {
    reporters: Vec<Box<dyn Reporter<S>>>,
}

impl<S> CompositeReporter<S> {
    pub fn new(reporters: Vec<Box<dyn Reporter<S>>>) -> Self {
        Self { reporters }
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl<S: Clone> Reporter<S> for CompositeReporter<S> {
    fn report_span(&self, span: S) {
        if let Some((last, rest)) = self.reporters.split_last() {
            for reporter in rest {
                reporter.report_span(span.clone());
            }
            last.report_span(span);
        }
    }

    fn set_process(&self, service_name: &str, tags: Tags, max_length: usize) {
        for reporter in &self.reporters {
            reporter.set_process(service_name, tags.clone(), max_length);
        }
    }

    fn close(&self) -> CloseFuture<'_> {
        let closes: Vec<_> = self.reporters.iter().map(|r| r.close()).collect();

        Box::pin(async move {
            let errors: Vec<ReporterError> = join_all(closes)
                .await
                .into_iter()
                .filter_map(Result::err)
                .collect();

            if errors.is_empty() {
                Ok(())
            } else {
                tracing::warn!(failed = errors.len(), "composite reporter close failed");
                Err(ReporterError::Composite(errors))
            }
        })
    }
}
