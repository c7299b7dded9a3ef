//! Heap abstraction.
//!
//! A `Heap` hands out aligned byte buffers and keeps track of which ones
//! are still live. Every buffer that flows through the pipeline (read
//! results, compression frames, write payloads) comes from a `Heap`.
//!
//! # Implementors
//!
//! - `TrackedHeap` (default): system allocator behind a mutex, with a
//!   live-allocation table that is reported as leaks on drop.

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crate::error::{FsError, Result};

/// An owned, aligned, zero-initialised byte buffer.
///
/// `len` is the number of bytes currently exposed through `Deref`;
/// `capacity` is the size of the allocation. Because the allocation is
/// zeroed up front, growing `len` up to `capacity` never exposes
/// uninitialised memory.
pub struct HeapBuf {
    ptr: NonNull<u8>,
    len: usize,
    cap: usize,
    align: usize,
    id: u64,
}

// Safety: HeapBuf uniquely owns its allocation, like Vec<u8>.
unsafe impl Send for HeapBuf {}
unsafe impl Sync for HeapBuf {}

impl HeapBuf {
    /// Allocate `cap` zeroed bytes aligned to `align`.
    ///
    /// `id` is an opaque tag chosen by the owning heap so it can recognise
    /// the buffer when it comes back through `Heap::free`.
    pub fn zeroed(cap: usize, align: usize, id: u64) -> Result<Self> {
        let layout = Layout::from_size_align(cap, align)
            .map_err(|_| FsError::Alloc { size: cap, align })?;
        let ptr = if cap == 0 {
            // Zero-sized: never dereferenced past len 0, never deallocated.
            NonNull::new(align as *mut u8)
        } else {
            // Safety: layout has non-zero size.
            NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
        };
        let ptr = ptr.ok_or(FsError::Alloc { size: cap, align })?;
        Ok(Self { ptr, len: cap, cap, align, id })
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    /// Set the visible length. Panics if `len > capacity()`.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.cap, "HeapBuf::set_len({}) beyond capacity {}", len, self.cap);
        self.len = len;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // Safety: ptr is valid for cap bytes, all initialised; len <= cap.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: as above, and &mut self guarantees exclusivity.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Deref for HeapBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for HeapBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl Drop for HeapBuf {
    fn drop(&mut self) {
        if self.cap != 0 {
            // Safety: same layout that was validated in zeroed().
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.cap, self.align);
                alloc::dealloc(self.ptr.as_ptr(), layout);
            }
        }
    }
}

impl fmt::Debug for HeapBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBuf")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("cap", &self.cap)
            .field("align", &self.align)
            .finish()
    }
}

/// Thread-safe buffer allocator shared by every AFS thread.
///
/// **Contract:**
/// - `alloc()` returns a zeroed buffer of exactly `size` bytes.
/// - `free()` takes back a buffer this heap produced. Buffers dropped
///   without going through `free()` still release their memory but stay
///   in the heap's live accounting.
/// - Every buffer a job owns comes from a `Heap`. A `Codec` may still use
///   private scratch memory internally; none of it outlives the call.
pub trait Heap: Send + Sync {
    fn alloc(&self, size: usize, align: usize) -> Result<HeapBuf>;

    fn free(&self, buf: HeapBuf);

    /// Number of buffers handed out and not yet freed.
    fn live_allocations(&self) -> usize;

    /// Bytes held by those buffers.
    fn live_bytes(&self) -> usize;

    /// Allocate and fill with a copy of `src`.
    fn alloc_copy(&self, src: &[u8], align: usize) -> Result<HeapBuf> {
        let mut buf = self.alloc(src.len(), align)?;
        buf.copy_from_slice(src);
        Ok(buf)
    }
}
