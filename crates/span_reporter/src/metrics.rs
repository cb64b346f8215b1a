//! Metrics sink capability.
//!
//! The reporter never touches global state: counters and gauges are created
//! from a [`MetricsFactory`] handed in at construction, so two reporters in
//! the same process keep separate counts unless they share a factory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A monotonically increasing counter.
pub trait Counter: Send + Sync {
    fn increment(&self, value: u64);
}

/// A point-in-time value.
pub trait Gauge: Send + Sync {
    fn update(&self, value: i64);
}

/// Produces named, tagged counters and gauges.
pub trait MetricsFactory: Send + Sync {
    fn create_counter(&self, name: &str, tags: &[(&str, &str)]) -> Arc<dyn Counter>;

    fn create_gauge(&self, name: &str, tags: &[(&str, &str)]) -> Arc<dyn Gauge>;
}

/// Factory whose metrics discard every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsFactory;

struct Noop;

impl Counter for Noop {
    fn increment(&self, _value: u64) {}
}

impl Gauge for Noop {
    fn update(&self, _value: i64) {}
}

impl MetricsFactory for NoopMetricsFactory {
    fn create_counter(&self, _name: &str, _tags: &[(&str, &str)]) -> Arc<dyn Counter> {
        Arc::new(Noop)
    }

    fn create_gauge(&self, _name: &str, _tags: &[(&str, &str)]) -> Arc<dyn Gauge> {
        Arc::new(Noop)
    }
}

/// Factory that keeps every metric in memory, keyed by flattened name.
///
/// Keys have the form `{namespace}{name}.{tag}_{value}` with tags sorted by
/// key, e.g. `reporter_spans.result_dropped`. A counter only shows up in
/// [`counters`](Self::counters) after it was first incremented.
#[derive(Default)]
pub struct InMemoryMetricsFactory {
    namespace: String,
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
    gauges: Mutex<HashMap<String, Arc<AtomicI64>>>,
}

impl InMemoryMetricsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every key with `namespace` (e.g. `"jaeger:"`).
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    fn key(&self, name: &str, tags: &[(&str, &str)]) -> String {
        let mut tags = tags.to_vec();
        tags.sort_unstable();
        let mut key = format!("{}{}", self.namespace, name);
        for (tag, value) in tags {
            key.push('.');
            key.push_str(tag);
            key.push('_');
            key.push_str(value);
        }
        key
    }

    /// Current value of an incremented counter.
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|c| c.load(Ordering::Relaxed))
            .filter(|v| *v > 0)
    }

    /// Snapshot of all counters that have been incremented.
    pub fn counters(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, c)| (k.clone(), c.load(Ordering::Relaxed)))
            .filter(|(_, v)| *v > 0)
            .collect()
    }

    /// Last value written to a gauge.
    pub fn gauge(&self, key: &str) -> Option<i64> {
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|g| g.load(Ordering::Relaxed))
    }
}

struct CounterCell(Arc<AtomicU64>);

impl Counter for CounterCell {
    fn increment(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }
}

struct GaugeCell(Arc<AtomicI64>);

impl Gauge for GaugeCell {
    fn update(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

impl MetricsFactory for InMemoryMetricsFactory {
    fn create_counter(&self, name: &str, tags: &[(&str, &str)]) -> Arc<dyn Counter> {
        let key = self.key(name, tags);
        let cell = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone();
        Arc::new(CounterCell(cell))
    }

    fn create_gauge(&self, name: &str, tags: &[(&str, &str)]) -> Arc<dyn Gauge> {
        let key = self.key(name, tags);
        let cell = self
            .gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone();
        Arc::new(GaugeCell(cell))
    }
}

/// Metrics emitted by the batching reporter.
#[derive(Clone)]
pub struct ReporterMetrics {
    /// `reporter_spans{result=ok}`: spans in successfully sent batches
    pub spans_ok: Arc<dyn Counter>,
    /// `reporter_spans{result=err}`: spans in failed batches
    pub spans_err: Arc<dyn Counter>,
    /// `reporter_spans{result=dropped}`: spans rejected on submission
    pub spans_dropped: Arc<dyn Counter>,
    /// `reporter_queue_length`: queued spans after each send
    pub queue_length: Arc<dyn Gauge>,
}

impl ReporterMetrics {
    pub fn new(factory: &dyn MetricsFactory) -> Self {
        Self {
            spans_ok: factory.create_counter("reporter_spans", &[("result", "ok")]),
            spans_err: factory.create_counter("reporter_spans", &[("result", "err")]),
            spans_dropped: factory.create_counter("reporter_spans", &[("result", "dropped")]),
            queue_length: factory.create_gauge("reporter_queue_length", &[]),
        }
    }
}

impl Default for ReporterMetrics {
    fn default() -> Self {
        Self::new(&NoopMetricsFactory)
    }
}
