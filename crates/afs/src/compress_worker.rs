//! Compression worker: runs the codec stage of a job.
//!
//! Compress (write path): replace the payload with a frame, keep the
//! original until the disk write succeeds, raise `stage`. Deferred writes
//! are then handed to the file queue from here.
//!
//! Decompress (read path): replace the frame with the plain bytes, raise
//! `stage`, then finish the read (terminator + `done`) right here so the
//! file worker never waits on this stage.
//!
//! Codec failures are never job failures: the untransformed buffer stays
//! in place and the job carries on.

use std::sync::Arc;

use afs_core::entry::CompressionIntent;
use afs_core::queue::JobQueue;
use afs_module::frame;

use log::{debug, info, warn};

use crate::file_worker;
use crate::pipeline::Pipeline;
use crate::work::WorkHandle;

/// Worker thread main loop.
pub(crate) fn run<Q: JobQueue<WorkHandle>>(pipeline: Arc<Pipeline<Q>>) {
    info!("compression worker started ({})", pipeline.codec.name());
    let mut jobs = 0u64;
    while let Some(work) = pipeline.compress_queue.pop() {
        process(&pipeline, work);
        jobs += 1;
    }
    info!("compression worker exiting after {} jobs", jobs);
}

pub(crate) fn process<Q: JobQueue<WorkHandle>>(pipeline: &Pipeline<Q>, work: WorkHandle) {
    let job = work.work();
    match job.intent() {
        CompressionIntent::CompressThenWrite => {
            compress(pipeline, &work);
            job.stage_done();
            if job.forward_after_stage() {
                pipeline.hand_to_file_worker(work);
            }
        }
        CompressionIntent::ReadThenDecompress => {
            decompress(pipeline, &work);
            job.stage_done();
            file_worker::finish_read(&work);
        }
        CompressionIntent::None => {
            warn!("{} reached the compression stage with no codec intent", job.path());
            job.stage_done();
        }
    }
}

fn compress<Q: JobQueue<WorkHandle>>(pipeline: &Pipeline<Q>, work: &WorkHandle) {
    let job = work.work();
    let mut state = job.state();
    let Some(src) = state.buffer.as_ref() else {
        return;
    };
    match frame::compress(&*pipeline.codec, job.heap(), src, pipeline.align()) {
        Ok(framed) => {
            debug!("compressed {}: {} -> {} bytes", job.path(), src.len(), framed.len());
            state.original = state.buffer.replace(framed);
        }
        Err(e) => {
            warn!("compressing {} failed, storing raw bytes: {}", job.path(), e);
        }
    }
}

fn decompress<Q: JobQueue<WorkHandle>>(pipeline: &Pipeline<Q>, work: &WorkHandle) {
    let job = work.work();
    let mut state = job.state();
    let Some(src) = state.buffer.as_ref() else {
        return;
    };
    let spare = usize::from(job.null_terminate());
    let max_len = pipeline.config.max_decompressed_len;
    match frame::decompress(&*pipeline.codec, job.heap(), src, spare, max_len, pipeline.align()) {
        Ok(plain) => {
            debug!("decompressed {}: {} -> {} bytes", job.path(), src.len(), plain.len());
            state.transferred_size = plain.len();
            if let Some(old) = state.buffer.replace(plain) {
                job.heap().free(old);
            }
        }
        Err(e) => {
            warn!("decompressing {} failed, keeping raw bytes: {}", job.path(), e);
        }
    }
}
