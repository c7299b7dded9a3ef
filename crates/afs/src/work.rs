//! Work items and the caller-facing handle.
//!
//! A `Work` is created on the submitting thread, travels through one or
//! both worker queues, and is observed by the submitter through a
//! `WorkHandle`. Two signals sequence ownership of the mutable part:
//!
//! - `stage`: the compression stage finished (or was skipped).
//! - `done`: the whole job finished, successfully or not.
//!
//! The mutable state sits behind a mutex, but only one party ever uses it
//! at a time: the worker that currently holds the item, or the submitter
//! after `done` is raised.

use std::fmt;
use std::sync::Arc;

use afs_core::entry::{CompressionIntent, JobPath, WorkOp};
use afs_core::error::FsError;
use afs_core::heap::{Heap, HeapBuf};
use afs_core::signal::CompletionSignal;
use afs_module::EventSignal;

use parking_lot::{Mutex, MutexGuard};

/// Fields owned by whichever stage holds the item.
#[derive(Default)]
pub(crate) struct WorkState {
    /// Current payload: the caller's data, a compressed frame, or read bytes.
    pub buffer: Option<HeapBuf>,
    /// Caller's uncompressed payload, held back until the disk write of
    /// the compressed frame succeeds.
    pub original: Option<HeapBuf>,
    pub requested_size: usize,
    pub transferred_size: usize,
    pub error: Option<FsError>,
}

pub(crate) struct Work {
    path: JobPath,
    op: WorkOp,
    intent: CompressionIntent,
    null_terminate: bool,
    /// Compression worker forwards the item to the file queue itself.
    forward_after_stage: bool,
    heap: Arc<dyn Heap>,
    stage: EventSignal,
    done: EventSignal,
    state: Mutex<WorkState>,
}

impl Work {
    #[inline]
    pub fn path(&self) -> &JobPath {
        &self.path
    }

    #[inline]
    pub fn op(&self) -> WorkOp {
        self.op
    }

    #[inline]
    pub fn intent(&self) -> CompressionIntent {
        self.intent
    }

    #[inline]
    pub fn null_terminate(&self) -> bool {
        self.null_terminate
    }

    #[inline]
    pub fn forward_after_stage(&self) -> bool {
        self.forward_after_stage
    }

    #[inline]
    pub fn heap(&self) -> &dyn Heap {
        &*self.heap
    }

    #[inline]
    pub fn state(&self) -> MutexGuard<'_, WorkState> {
        self.state.lock()
    }

    pub fn stage_done(&self) {
        self.stage.raise();
    }

    pub fn wait_stage(&self) {
        self.stage.wait();
    }

    /// Record a terminal failure. The first failure wins.
    pub fn fail(&self, err: FsError) {
        let mut state = self.state();
        if state.error.is_none() {
            state.error = Some(err);
        }
    }

    /// Raise both signals. Called exactly once per job, last.
    pub fn finish(&self) {
        self.stage.raise();
        self.done.raise();
    }
}

/// Builder-ish constructor arguments, kept crate-private.
pub(crate) struct WorkSpec {
    pub path: JobPath,
    pub op: WorkOp,
    pub intent: CompressionIntent,
    pub null_terminate: bool,
    pub forward_after_stage: bool,
    pub heap: Arc<dyn Heap>,
    pub buffer: Option<HeapBuf>,
}

/// Caller's handle to a submitted job.
///
/// Every accessor except `is_done()` waits for the job to finish first,
/// so they are safe to call at any point after submission.
#[derive(Clone)]
pub struct WorkHandle {
    work: Arc<Work>,
}

impl WorkHandle {
    pub(crate) fn new(spec: WorkSpec) -> Self {
        Self::build(spec, None)
    }

    /// A job that failed before reaching any queue. Already done.
    pub(crate) fn rejected(spec: WorkSpec, err: FsError) -> Self {
        Self::build(spec, Some(err))
    }

    fn build(spec: WorkSpec, error: Option<FsError>) -> Self {
        let requested_size = spec.buffer.as_ref().map_or(0, |b| b.len());
        let signal: fn() -> EventSignal = if error.is_some() { EventSignal::raised } else { EventSignal::new };
        Self {
            work: Arc::new(Work {
                path: spec.path,
                op: spec.op,
                intent: spec.intent,
                null_terminate: spec.null_terminate,
                forward_after_stage: spec.forward_after_stage,
                heap: spec.heap,
                stage: signal(),
                done: signal(),
                state: Mutex::new(WorkState {
                    buffer: spec.buffer,
                    requested_size,
                    error,
                    ..WorkState::default()
                }),
            }),
        }
    }

    #[inline]
    pub(crate) fn work(&self) -> &Work {
        &self.work
    }

    pub fn path(&self) -> &JobPath {
        self.work.path()
    }

    pub fn op(&self) -> WorkOp {
        self.work.op()
    }

    pub fn intent(&self) -> CompressionIntent {
        self.work.intent()
    }

    /// Non-blocking: has the job finished?
    pub fn is_done(&self) -> bool {
        self.work.done.is_raised()
    }

    /// Block until the job finishes.
    pub fn wait(&self) {
        self.work.done.wait();
    }

    /// Take ownership of the job's buffer.
    ///
    /// Reads: the file contents (plus a zero byte past `size()` when
    /// null-termination was requested). Writes: `None` after success;
    /// after a failure, the caller's original uncompressed payload.
    pub fn take_buffer(&self) -> Option<HeapBuf> {
        self.wait();
        self.work.state().buffer.take()
    }

    /// Reads: bytes of content, excluding any terminator.
    /// Writes: bytes that reached the disk.
    pub fn size(&self) -> usize {
        self.wait();
        self.work.state().transferred_size
    }

    /// Payload length at submission (writes); zero for reads.
    pub fn requested_size(&self) -> usize {
        self.wait();
        self.work.state().requested_size
    }

    /// Platform-style status code; 0 on success.
    pub fn result(&self) -> i32 {
        self.error().map_or(0, |e| e.code())
    }

    pub fn error(&self) -> Option<FsError> {
        self.wait();
        self.work.state().error.clone()
    }

    /// Wait, then release the job. A buffer the caller has not taken yet
    /// is handed back rather than freed.
    pub fn destroy(self) -> Option<HeapBuf> {
        self.take_buffer()
    }
}

impl fmt::Debug for WorkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandle")
            .field("path", self.work.path())
            .field("op", &self.work.op())
            .field("intent", &self.work.intent())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Poll a possibly-absent handle. No handle counts as done.
pub fn is_done(handle: Option<&WorkHandle>) -> bool {
    handle.map_or(true, WorkHandle::is_done)
}
