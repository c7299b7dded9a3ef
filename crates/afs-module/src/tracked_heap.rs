//! `TrackedHeap`: default `Heap` implementation.
//!
//! Buffers come from the system allocator. A mutex-guarded table records
//! every live buffer so leaks can be reported when the heap is dropped.
//! The heap is shared by every thread in the process, hence the lock.

use afs_core::error::Result;
use afs_core::heap::{Heap, HeapBuf};

use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffer ids are unique process-wide so a heap can tell its own
/// buffers from another heap's.
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Live-allocation bookkeeping. Only touched under the lock.
#[derive(Default)]
struct HeapState {
    /// id → capacity of every buffer handed out and not yet freed.
    live: HashMap<u64, usize>,
    live_bytes: usize,
    peak_bytes: usize,
    total_allocs: u64,
}

pub struct TrackedHeap {
    name: String,
    state: Mutex<HeapState>,
}

impl TrackedHeap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(HeapState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest `live_bytes` observed so far.
    pub fn peak_bytes(&self) -> usize {
        self.state.lock().peak_bytes
    }

    /// Allocations made over the heap's lifetime.
    pub fn total_allocations(&self) -> u64 {
        self.state.lock().total_allocs
    }

    /// Log every buffer still live. Returns how many there were.
    pub fn report_leaks(&self) -> usize {
        let state = self.state.lock();
        let mut leaks: Vec<_> = state.live.iter().collect();
        leaks.sort_unstable_by_key(|(id, _)| **id);
        for (id, size) in &leaks {
            warn!("heap {}: leaked buffer #{} of {} bytes", self.name, id, size);
        }
        leaks.len()
    }
}

impl Default for TrackedHeap {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Heap for TrackedHeap {
    fn alloc(&self, size: usize, align: usize) -> Result<HeapBuf> {
        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        let buf = HeapBuf::zeroed(size, align, id)?;
        state.total_allocs += 1;
        state.live.insert(id, size);
        state.live_bytes += size;
        state.peak_bytes = state.peak_bytes.max(state.live_bytes);
        Ok(buf)
    }

    fn free(&self, buf: HeapBuf) {
        let mut state = self.state.lock();
        match state.live.remove(&buf.id()) {
            Some(size) => state.live_bytes -= size,
            None => debug!(
                "heap {}: free of foreign buffer #{} ({} bytes)",
                self.name,
                buf.id(),
                buf.capacity()
            ),
        }
        drop(state);
        drop(buf);
    }

    fn live_allocations(&self) -> usize {
        self.state.lock().live.len()
    }

    fn live_bytes(&self) -> usize {
        self.state.lock().live_bytes
    }
}

impl Drop for TrackedHeap {
    fn drop(&mut self) {
        let leaked = self.report_leaks();
        if leaked > 0 {
            warn!("heap {}: {} buffer(s) never freed", self.name, leaked);
        }
    }
}
