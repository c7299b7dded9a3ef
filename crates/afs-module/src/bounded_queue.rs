//! `BoundedQueue`: default `JobQueue` implementation.
//!
//! Items live in a lock-free `ArrayQueue`. The lock and the two condvars
//! exist only to park producers on a full queue and consumers on an empty
//! one; the fast paths never touch them except to notify.
//!
//! Lost wakeups are ruled out by always notifying under the lock and
//! re-checking fullness/emptiness under the lock before parking.

use afs_core::queue::JobQueue;

use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};

pub struct BoundedQueue<T> {
    slots: ArrayQueue<Option<T>>,
    lock: Mutex<()>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(capacity.max(1)),
            lock: Mutex::new(()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn wake_consumer(&self) {
        let _guard = self.lock.lock();
        self.not_empty.notify_one();
    }

    fn wake_producer(&self) {
        let _guard = self.lock.lock();
        self.not_full.notify_one();
    }
}

impl<T: Send> JobQueue<T> for BoundedQueue<T> {
    fn push(&self, item: Option<T>) {
        let mut item = item;
        loop {
            match self.slots.push(item) {
                Ok(()) => {
                    self.wake_consumer();
                    return;
                }
                Err(back) => {
                    item = back;
                    let mut guard = self.lock.lock();
                    if self.slots.is_full() {
                        self.not_full.wait(&mut guard);
                    }
                }
            }
        }
    }

    fn try_push(&self, item: Option<T>) -> Result<(), Option<T>> {
        self.slots.push(item)?;
        self.wake_consumer();
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        loop {
            if let Some(item) = self.slots.pop() {
                self.wake_producer();
                return item;
            }
            let mut guard = self.lock.lock();
            if self.slots.is_empty() {
                self.not_empty.wait(&mut guard);
            }
        }
    }

    fn try_pop(&self) -> Option<Option<T>> {
        let item = self.slots.pop()?;
        self.wake_producer();
        Some(item)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn capacity(&self) -> usize {
        self.slots.capacity()
    }
}
