//! Job queue abstraction.
//!
//! A `JobQueue` carries work items between the submitting threads and the
//! two AFS workers, and between the workers themselves.
//!
//! # Implementors
//!
//! - `BoundedQueue` (default): fixed-capacity lock-free ring with
//!   condvar-based blocking on full/empty.
//!
//! # Sentinel
//!
//! Slots carry `Option<T>`. Pushing `None` wakes one consumer and tells it
//! to exit; it is how a worker is shut down. Any job queued ahead of the
//! sentinel is still delivered first (FIFO).

/// Thread-safe bounded multi-producer / multi-consumer queue.
///
/// **Contract:**
/// - `push()` blocks while the queue is full.
/// - `try_push()` never blocks; on a full queue it hands the item back.
/// - `pop()` blocks while the queue is empty and returns `None` only for
///   a sentinel.
pub trait JobQueue<T: Send>: Send + Sync {
    fn push(&self, item: Option<T>);

    fn try_push(&self, item: Option<T>) -> Result<(), Option<T>>;

    fn pop(&self) -> Option<T>;

    /// Non-blocking pop. Outer `None` means the queue was empty.
    fn try_pop(&self) -> Option<Option<T>>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
