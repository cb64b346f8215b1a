//! Bounded span queue shared between reporting callers and the worker.
//!
//! Producers call [`SpanQueue::try_enqueue`], which never waits: a full or
//! closed queue hands the item straight back. The single consumer awaits
//! [`SpanQueue::dequeue`]. Every accepted item stays "unfinished" until the
//! consumer retires it with [`SpanQueue::mark_done`], so [`SpanQueue::drained`]
//! can wait for items that were dequeued but are still being batched or sent.

use crate::error::EnqueueError;
#[cfg(debug_assertions)]
use crate::invariants::{debug_assert_queue_bounded, debug_assert_unfinished_covers};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO with a drain-complete signal.
pub struct SpanQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    /// Accepted items not yet retired via `mark_done`
    unfinished: AtomicUsize,
    /// Wakes the consumer when an item arrives or the queue closes
    data_notify: Notify,
    /// Wakes `drained()` waiters when `unfinished` reaches zero
    drained_notify: Notify,
}

impl<T> SpanQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
            }),
            capacity,
            unfinished: AtomicUsize::new(0),
            data_notify: Notify::new(),
            drained_notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // Queue state stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` without blocking.
    pub fn try_enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(EnqueueError::Closed(item));
            }
            if inner.items.len() >= self.capacity {
                return Err(EnqueueError::Full(item));
            }
            inner.items.push_back(item);
            // Counted under the lock so `close()` + drain always observes it
            self.unfinished.fetch_add(1, Ordering::AcqRel);

            #[cfg(debug_assertions)]
            debug_assert_queue_bounded!(inner.items.len(), self.capacity);
        }
        self.data_notify.notify_one();
        Ok(())
    }

    /// Removes the oldest item, if any.
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once the queue is closed and empty. Cancel safe: an item
    /// is only removed in the poll that returns it.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            let notified = self.data_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Retires `count` items that were fully processed.
    pub fn mark_done(&self, count: usize) {
        if count == 0 {
            return;
        }
        let previous = self.unfinished.fetch_sub(count, Ordering::AcqRel);

        #[cfg(debug_assertions)]
        debug_assert_unfinished_covers!(previous, count);

        if previous == count {
            self.drained_notify.notify_waiters();
        }
    }

    /// Waits until every accepted item has been retired.
    pub async fn drained(&self) {
        loop {
            let notified = self.drained_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.unfinished.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting items and wakes the consumer.
    ///
    /// Items already queued remain available to `dequeue`/`try_dequeue`.
    pub fn close(&self) {
        self.lock().closed = true;
        self.data_notify.notify_waiters();
        // A consumer between `enable()` and its lock still needs a permit
        self.data_notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of accepted items not yet retired (queued, batched or in flight).
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::Acquire)
    }
}
