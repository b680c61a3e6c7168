//! Blocking hand-off queue shared between the producer and consumer threads.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Capability interface for a thread-safe queue with blocking pops.
///
/// Producers and consumers only see this trait, so a different backing
/// structure can be swapped in without touching either loop.
pub trait BlockingQueue<T>: Send + Sync {
    /// Appends `element` to the back and wakes every waiting popper.
    fn put(&self, element: T);

    /// Inserts `element` ahead of every normal element, behind any earlier
    /// prioritized ones, and wakes every waiting popper.
    fn put_prioritized(&self, element: T);

    /// Blocks until an element is available, then removes and returns it.
    fn wait_and_pop(&self) -> T;

    /// Like [`wait_and_pop`](Self::wait_and_pop) but gives up after `timeout`.
    fn wait_and_pop_for(&self, timeout: Duration) -> Option<T>;

    /// Removes the front element without blocking.
    fn try_pop(&self) -> Option<T>;

    /// Point-in-time check; stale as soon as the lock is released.
    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    /// Throws away every element and re-creates the underlying storage.
    fn reset(&self);

    /// Throws away every element, keeping the allocation.
    fn clear(&self);
}

struct Inner<T> {
    items: VecDeque<T>,
    // Prioritized elements not yet popped; they always sit at the head.
    prioritized: usize,
}

impl<T> Inner<T> {
    fn new() -> Self {
        Self { items: VecDeque::new(), prioritized: 0 }
    }

    fn pop(&mut self) -> Option<T> {
        let item = self.items.pop_front()?;
        self.prioritized = self.prioritized.saturating_sub(1);
        Some(item)
    }
}

/// [`BlockingQueue`] over a mutex-guarded `VecDeque` and a condition variable.
///
/// Unbounded: `put` never blocks, so a slow consumer cannot stall the
/// transport poll loop feeding it.
pub struct ThreadSafeQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> ThreadSafeQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::new()), not_empty: Condvar::new() }
    }
}

impl<T> Default for ThreadSafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> BlockingQueue<T> for ThreadSafeQueue<T> {
    fn put(&self, element: T) {
        self.inner.lock().items.push_back(element);
        self.not_empty.notify_all();
    }

    fn put_prioritized(&self, element: T) {
        {
            let mut inner = self.inner.lock();
            let at = inner.prioritized;
            inner.items.insert(at, element);
            inner.prioritized += 1;
        }
        self.not_empty.notify_all();
    }

    fn wait_and_pop(&self) -> T {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.pop() {
                return item;
            }
            // Spurious and broadcast wakeups land back here and re-block.
            self.not_empty.wait(&mut inner);
        }
    }

    fn wait_and_pop_for(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.inner.lock();
        self.not_empty.wait_while_for(&mut inner, |inner| inner.items.is_empty(), timeout);
        inner.pop()
    }

    fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop()
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    fn reset(&self) {
        *self.inner.lock() = Inner::new();
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.prioritized = 0;
    }
}
