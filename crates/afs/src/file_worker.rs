//! File worker: the only thread that touches the disk.
//!
//! ```text
//! loop {
//!     pop file queue ── sentinel ──► exit
//!     Read:  open → size → alloc → read
//!              ├─ failure ──────────────► free partial buffer, done
//!              ├─ decompress ───────────► hand to compressor (no wait)
//!              └─ plain ────────────────► terminator, done
//!     Write: create/truncate → write_all
//!              ├─ failure ──────────────► restore original payload, done
//!              └─ success ──────────────► free buffers, done
//! }
//! ```

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;

use afs_core::entry::WorkOp;
use afs_core::error::{FsError, Result};
use afs_core::heap::{Heap, HeapBuf};
use afs_core::queue::JobQueue;

use log::{debug, info, warn};

use crate::pipeline::Pipeline;
use crate::work::WorkHandle;

/// Worker thread main loop.
pub(crate) fn run<Q: JobQueue<WorkHandle>>(pipeline: Arc<Pipeline<Q>>) {
    info!("file worker started");
    let mut jobs = 0u64;
    while let Some(work) = pipeline.file_queue.pop() {
        process(&pipeline, work);
        jobs += 1;
    }
    info!("file worker exiting after {} jobs", jobs);
}

pub(crate) fn process<Q: JobQueue<WorkHandle>>(pipeline: &Pipeline<Q>, work: WorkHandle) {
    match work.op() {
        WorkOp::Read => read(pipeline, work),
        WorkOp::Write => write(&work),
    }
}

fn read<Q: JobQueue<WorkHandle>>(pipeline: &Pipeline<Q>, work: WorkHandle) {
    let job = work.work();
    let spare = usize::from(job.null_terminate());
    match load(job.path().as_path(), job.heap(), spare, pipeline.align()) {
        Ok(buf) => {
            debug!("read {} ({} bytes)", job.path(), buf.len());
            {
                let mut state = job.state();
                state.transferred_size = buf.len();
                state.buffer = Some(buf);
            }
            if job.intent().uses_codec() {
                pipeline.hand_to_compressor(work);
            } else {
                job.stage_done();
                finish_read(&work);
            }
        }
        Err(err) => {
            warn!("read {} failed: {}", job.path(), err);
            job.fail(err);
            job.finish();
        }
    }
}

/// Last step of every successful read, on whichever thread ran the final
/// stage: place the terminator, record the size, raise done.
pub(crate) fn finish_read(work: &WorkHandle) {
    let job = work.work();
    let mut guard = job.state();
    let state = &mut *guard;
    if let Some(buf) = state.buffer.as_mut() {
        state.transferred_size = buf.len();
        if job.null_terminate() {
            terminate(buf);
        }
    }
    drop(guard);
    job.finish();
}

fn terminate(buf: &mut HeapBuf) {
    let len = buf.len();
    if buf.capacity() > len {
        buf.set_len(len + 1);
        buf[len] = 0;
    } else {
        // Every read path reserves the spare byte; reaching here is a bug.
        warn!("no room for terminator after {} bytes", len);
    }
}

/// Read the whole file into a fresh buffer with `spare` extra bytes of
/// capacity. The returned buffer's `len()` is the number of bytes read.
fn load(path: &Path, heap: &dyn Heap, spare: usize, align: usize) -> Result<HeapBuf> {
    let mut file = File::open(path).map_err(|e| FsError::open(&e))?;
    let len = file.metadata().map_err(|e| FsError::size_query(&e))?.len();
    let len = usize::try_from(len).map_err(|_| FsError::SizeQuery { code: libc::EFBIG })?;

    let mut buf = heap.alloc(len + spare, align)?;
    let mut filled = 0;
    while filled < len {
        match file.read(&mut buf[filled..len]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                heap.free(buf);
                return Err(FsError::read(&e));
            }
        }
    }
    buf.set_len(filled);
    Ok(buf)
}

fn write(work: &WorkHandle) {
    let job = work.work();
    let mut state = job.state();
    let stored = match state.buffer.as_deref() {
        Some(bytes) => store(job.path().as_path(), bytes),
        None => store(job.path().as_path(), &[]),
    };

    match stored {
        Ok(n) => {
            debug!("wrote {} ({} bytes)", job.path(), n);
            state.transferred_size = n;
            if let Some(buf) = state.buffer.take() {
                job.heap().free(buf);
            }
            if let Some(original) = state.original.take() {
                job.heap().free(original);
            }
        }
        Err(err) => {
            warn!("write {} failed: {}", job.path(), err);
            // Give the caller back what they submitted, not the frame.
            if let Some(original) = state.original.take() {
                if let Some(frame) = state.buffer.replace(original) {
                    job.heap().free(frame);
                }
            }
            if state.error.is_none() {
                state.error = Some(err);
            }
        }
    }
    drop(state);
    job.finish();
}

fn store(path: &Path, bytes: &[u8]) -> Result<usize> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| FsError::open(&e))?;
    file.write_all(bytes).map_err(|e| FsError::write(&e))?;
    file.flush().map_err(|e| FsError::write(&e))?;
    Ok(bytes.len())
}
