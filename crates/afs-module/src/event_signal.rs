//! `EventSignal`: default `CompletionSignal` implementation.
//!
//! Raised state lives in an atomic so `is_raised()` and an already-raised
//! `wait()` never take the lock. Sleepers park on a condvar; `raise()`
//! flips the flag under the lock and wakes them all.

use afs_core::signal::CompletionSignal;

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct EventSignal {
    raised: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl EventSignal {
    pub fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// A signal that starts raised.
    pub fn raised() -> Self {
        let signal = Self::new();
        signal.raised.store(true, Ordering::Release);
        signal
    }
}

impl Default for EventSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal for EventSignal {
    fn raise(&self) {
        let _guard = self.lock.lock();
        self.raised.store(true, Ordering::Release);
        self.cond.notify_all();
    }

    fn wait(&self) {
        if self.raised.load(Ordering::Acquire) {
            return;
        }
        let mut guard = self.lock.lock();
        while !self.raised.load(Ordering::Acquire) {
            self.cond.wait(&mut guard);
        }
    }

    #[inline]
    fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
