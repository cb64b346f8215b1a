//! Debug assertion macros for reporter and rate limiter invariants.
//!
//! These macros are only active in debug builds (`#[cfg(debug_assertions)]`),
//! so there is zero overhead in release builds.

// =============================================================================
// Rate limiter: bounded balance
// =============================================================================

/// Assert that the credit balance lies within `[0, max_balance]`.
///
/// **Invariant**: `0 <= balance <= max_balance` after every tick
///
/// Used in: `RateLimiter::check_credit_at()`, `RateLimiter::update_at()`
macro_rules! debug_assert_balance_bounded {
    ($balance:expr, $max_balance:expr) => {
        debug_assert!(
            $balance >= 0.0 && $balance <= $max_balance,
            "credit balance {} outside [0, {}]",
            $balance,
            $max_balance
        )
    };
}

// =============================================================================
// Queue: bounded length
// =============================================================================

/// Assert that the queue never holds more than `capacity` items.
///
/// **Invariant**: `len <= capacity`
///
/// Used in: `SpanQueue::try_enqueue()`
macro_rules! debug_assert_queue_bounded {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "span queue holds {} items, capacity is {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Queue: unfinished accounting
// =============================================================================

/// Assert that `mark_done` never retires more items than were accepted.
///
/// **Invariant**: `done <= unfinished`
///
/// Used in: `SpanQueue::mark_done()`
macro_rules! debug_assert_unfinished_covers {
    ($unfinished:expr, $done:expr) => {
        debug_assert!(
            $done <= $unfinished,
            "mark_done({}) called with only {} unfinished items",
            $done,
            $unfinished
        )
    };
}

// =============================================================================
// Worker: batch size
// =============================================================================

/// Assert that a size-triggered batch never exceeds `batch_size`.
///
/// **Invariant**: `pending.len() <= batch_size` before every send
///
/// Used in: `Worker::run()`
macro_rules! debug_assert_batch_within_limit {
    ($len:expr, $batch_size:expr) => {
        debug_assert!(
            $len <= $batch_size,
            "pending batch of {} spans exceeds batch_size {}",
            $len,
            $batch_size
        )
    };
}

// =============================================================================
// Worker: drained on close
// =============================================================================

/// Assert that nothing remains queued or pending once the worker stops.
///
/// **Invariant**: `closed → queue.len() == 0 && pending.is_empty()`
///
/// Used in: `Worker::run()`
macro_rules! debug_assert_drained {
    ($queued:expr, $pending:expr) => {
        debug_assert!(
            $queued == 0 && $pending == 0,
            "worker stopping with {} queued and {} pending spans",
            $queued,
            $pending
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_balance_bounded;
pub(crate) use debug_assert_batch_within_limit;
pub(crate) use debug_assert_drained;
pub(crate) use debug_assert_queue_bounded;
pub(crate) use debug_assert_unfinished_covers;
