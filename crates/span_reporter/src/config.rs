//! Configuration for the batching reporter.

use crate::error::ConfigError;
use std::time::Duration;

/// Configuration for [`BatchingReporter`](crate::BatchingReporter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Number of spans that triggers a send.
    ///
    /// Default: 10
    pub batch_size: usize,

    /// Maximum time a non-empty batch waits before it is sent regardless of
    /// size. `None` disables time-based flushing.
    ///
    /// Default: 1s
    pub flush_interval: Option<Duration>,

    /// Maximum number of spans waiting in the queue. Spans reported while
    /// the queue is full are dropped.
    ///
    /// Default: 100
    pub queue_capacity: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: Some(Duration::from_secs(1)),
            queue_capacity: 100,
        }
    }
}

impl ReporterConfig {
    /// Creates a low-latency configuration: small batches, short flush interval.
    pub fn low_latency() -> Self {
        Self {
            batch_size: 1,
            flush_interval: Some(Duration::from_millis(100)),
            queue_capacity: 100,
        }
    }

    /// Creates a high-throughput configuration with larger batches and queue.
    pub fn high_throughput() -> Self {
        Self {
            batch_size: 512,
            flush_interval: Some(Duration::from_secs(5)),
            queue_capacity: 8192,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Disables time-based flushing; batches are sent only when full or on close.
    pub fn without_flush_interval(mut self) -> Self {
        self.flush_interval = None;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.queue_capacity));
        }
        if self.flush_interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::ZeroFlushInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ReporterConfig::default().validate().is_ok());
        assert!(ReporterConfig::low_latency().validate().is_ok());
        assert!(ReporterConfig::high_throughput().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert_eq!(
            ReporterConfig::default().with_batch_size(0).validate(),
            Err(ConfigError::InvalidBatchSize(0))
        );
        assert_eq!(
            ReporterConfig::default().with_queue_capacity(0).validate(),
            Err(ConfigError::InvalidQueueCapacity(0))
        );
        assert_eq!(
            ReporterConfig::default()
                .with_flush_interval(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroFlushInterval)
        );
        assert!(ReporterConfig::default()
            .without_flush_interval()
            .validate()
            .is_ok());
    }
}
