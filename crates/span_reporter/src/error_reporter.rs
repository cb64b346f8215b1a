//! Error reporting capability used by the batching reporter.

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Sink for errors the reporter cannot surface to its callers.
///
/// Implementations may panic; the reporter isolates such panics so the
/// worker keeps running.
pub trait ErrorReporter: Send + Sync {
    /// Records `count` occurrences of `event`, caused by `cause`.
    fn error(&self, event: &str, count: u64, cause: &dyn Error);
}

/// Default interval between two logged errors.
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(15 * 60);

struct Throttle {
    last_logged: Option<Instant>,
    suppressed: u64,
}

/// Error reporter that logs via `tracing`, at most once per `log_interval`.
///
/// The first error is logged right away. Errors arriving before the interval
/// has elapsed are only counted; the count is attached to the next record.
pub struct ThrottledErrorReporter {
    log_interval: Duration,
    throttle: Mutex<Throttle>,
    logged: AtomicU64,
}

impl ThrottledErrorReporter {
    pub fn new(log_interval: Duration) -> Self {
        Self {
            log_interval,
            throttle: Mutex::new(Throttle {
                last_logged: None,
                suppressed: 0,
            }),
            logged: AtomicU64::new(0),
        }
    }

    /// Number of records written so far.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    /// Number of errors swallowed since the last record.
    pub fn suppressed(&self) -> u64 {
        self.throttle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .suppressed
    }
}

impl Default for ThrottledErrorReporter {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}

impl ErrorReporter for ThrottledErrorReporter {
    fn error(&self, event: &str, count: u64, cause: &dyn Error) {
        let now = Instant::now();
        let suppressed = {
            let mut throttle = self.throttle.lock().unwrap_or_else(PoisonError::into_inner);
            let due = throttle
                .last_logged
                .map_or(true, |last| now.saturating_duration_since(last) >= self.log_interval);
            if !due {
                throttle.suppressed += count;
                return;
            }
            throttle.last_logged = Some(now);
            std::mem::take(&mut throttle.suppressed)
        };

        self.logged.fetch_add(1, Ordering::Relaxed);
        tracing::error!(event, count, suppressed, error = %cause, "span reporter error");
    }
}
