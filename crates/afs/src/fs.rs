//! `FileSystem`: the facade that owns the pipeline.
//!
//! Owns both queues, both worker threads, the heap used for every
//! pipeline allocation, and the codec. Constructed once; torn down by
//! `shutdown()` or on drop.
//!
//! Submission:
//!
//! | Call              | Caller blocks on                        |
//! |-------------------|-----------------------------------------|
//! | `read`            | queue back-pressure only                |
//! | `write`           | compression stage, when compressing     |
//! | `write_deferred`  | queue back-pressure only                |

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use afs_core::codec::Codec;
use afs_core::entry::{CompressionIntent, JobPath, WorkOp};
use afs_core::error::{FsError, Result};
use afs_core::heap::{Heap, HeapBuf};
use afs_core::queue::JobQueue;
use afs_module::{BoundedQueue, Lz4Codec};

use log::{debug, info};

use crate::config::FsConfig;
use crate::pipeline::Pipeline;
use crate::work::{WorkHandle, WorkSpec};
use crate::{compress_worker, file_worker};

pub struct FileSystem<Q = BoundedQueue<WorkHandle>>
where
    Q: JobQueue<WorkHandle> + 'static,
{
    pipeline: Arc<Pipeline<Q>>,
    file_thread: Option<JoinHandle<()>>,
    compress_thread: Option<JoinHandle<()>>,
}

impl FileSystem<BoundedQueue<WorkHandle>> {
    /// Start the pipeline with the default LZ4 codec.
    pub fn new(config: FsConfig, heap: Arc<dyn Heap>) -> Result<Self> {
        Self::with_codec(config, heap, Arc::new(Lz4Codec))
    }

    pub fn with_codec(config: FsConfig, heap: Arc<dyn Heap>, codec: Arc<dyn Codec>) -> Result<Self> {
        let file_queue = BoundedQueue::new(config.queue_capacity);
        let compress_queue = BoundedQueue::new(config.queue_capacity);
        Self::with_queues(config, heap, codec, file_queue, compress_queue)
    }
}

impl<Q: JobQueue<WorkHandle> + 'static> FileSystem<Q> {
    /// Start the pipeline on caller-provided queues.
    pub fn with_queues(
        config: FsConfig,
        heap: Arc<dyn Heap>,
        codec: Arc<dyn Codec>,
        file_queue: Q,
        compress_queue: Q,
    ) -> Result<Self> {
        config.validate()?;
        let prefix = config.thread_name_prefix.clone();
        let pipeline = Arc::new(Pipeline::new(config, heap, codec, file_queue, compress_queue));

        let file_thread = {
            let pipeline = Arc::clone(&pipeline);
            thread::Builder::new()
                .name(format!("{}-file", prefix))
                .spawn(move || file_worker::run(pipeline))
                .map_err(|e| FsError::WorkerSpawn { code: FsError::os_code(&e) })?
        };

        let compress_thread = {
            let worker_pipeline = Arc::clone(&pipeline);
            let spawned = thread::Builder::new()
                .name(format!("{}-compress", prefix))
                .spawn(move || compress_worker::run(worker_pipeline));
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    pipeline.file_queue.push(None);
                    let _ = file_thread.join();
                    return Err(FsError::WorkerSpawn { code: FsError::os_code(&e) });
                }
            }
        };

        info!(
            "file system started (queue capacity {}, codec {})",
            pipeline.config.queue_capacity,
            pipeline.codec.name()
        );
        Ok(Self {
            pipeline,
            file_thread: Some(file_thread),
            compress_thread: Some(compress_thread),
        })
    }

    pub fn config(&self) -> &FsConfig {
        &self.pipeline.config
    }

    /// The heap write payloads should come from; successful writes free
    /// their buffers back into it.
    pub fn heap(&self) -> &Arc<dyn Heap> {
        &self.pipeline.heap
    }

    /// Copy `bytes` into a buffer from this file system's heap.
    pub fn alloc_copy(&self, bytes: &[u8]) -> Result<HeapBuf> {
        self.pipeline.heap.alloc_copy(bytes, self.pipeline.align())
    }

    /// Queue a read of `path`. The result buffer comes from `heap`.
    ///
    /// With `null_terminate`, one zero byte follows the content; `size()`
    /// does not count it. With `decompress`, the file must be a frame
    /// written by a compressing `write`.
    pub fn read(
        &self,
        path: &str,
        heap: Arc<dyn Heap>,
        null_terminate: bool,
        decompress: bool,
    ) -> WorkHandle {
        let spec = |path: JobPath| WorkSpec {
            path,
            op: WorkOp::Read,
            intent: CompressionIntent::for_read(decompress),
            null_terminate,
            forward_after_stage: false,
            heap,
            buffer: None,
        };
        let path = match JobPath::new(path) {
            Ok(p) => p,
            Err(err) => return WorkHandle::rejected(spec(JobPath::lossy(path)), err),
        };
        let work = WorkHandle::new(spec(path));
        debug!("queue read {} (decompress: {})", work.path(), decompress);
        self.pipeline.file_queue.push(Some(work.clone()));
        work
    }

    /// Queue a write of `buffer` to `path`; the pipeline takes ownership.
    ///
    /// With `compress`, this call blocks until the compression stage has
    /// run, then queues the disk write and returns.
    pub fn write(&self, path: &str, buffer: HeapBuf, compress: bool) -> WorkHandle {
        self.submit_write(path, buffer, compress, false)
    }

    /// Like `write`, but never waits for compression: the compression
    /// worker queues the disk write itself.
    pub fn write_deferred(&self, path: &str, buffer: HeapBuf, compress: bool) -> WorkHandle {
        self.submit_write(path, buffer, compress, true)
    }

    fn submit_write(&self, path: &str, buffer: HeapBuf, compress: bool, deferred: bool) -> WorkHandle {
        let spec = |path: JobPath, buffer: HeapBuf| WorkSpec {
            path,
            op: WorkOp::Write,
            intent: CompressionIntent::for_write(compress),
            null_terminate: false,
            forward_after_stage: compress && deferred,
            heap: Arc::clone(&self.pipeline.heap),
            buffer: Some(buffer),
        };
        let path = match JobPath::new(path) {
            Ok(p) => p,
            Err(err) => return WorkHandle::rejected(spec(JobPath::lossy(path), buffer), err),
        };
        let work = WorkHandle::new(spec(path, buffer));
        debug!(
            "queue write {} ({} bytes, compress: {}, deferred: {})",
            work.path(),
            work.work().state().requested_size,
            compress,
            deferred
        );

        if !compress {
            work.work().stage_done();
            self.pipeline.file_queue.push(Some(work.clone()));
        } else if deferred {
            self.pipeline.compress_queue.push(Some(work.clone()));
        } else {
            self.pipeline.compress_queue.push(Some(work.clone()));
            work.work().wait_stage();
            self.pipeline.file_queue.push(Some(work.clone()));
        }
        work
    }

    /// Stop both workers. Every job submitted before this call finishes.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // File worker first: it is the only one that feeds the compressor.
        if let Some(handle) = self.file_thread.take() {
            self.pipeline.file_queue.push(None);
            let _ = handle.join();
        }
        if let Some(handle) = self.compress_thread.take() {
            self.pipeline.compress_queue.push(None);
            let _ = handle.join();
        }
        self.pipeline.set_compressor_offline();

        // Deferred writes forwarded after the file worker saw its sentinel.
        let drained = self.pipeline.drain_file_queue();
        if drained > 0 {
            debug!("ran {} late file jobs during shutdown", drained);
        }
        info!("file system stopped");
    }
}

impl<Q: JobQueue<WorkHandle> + 'static> Drop for FileSystem<Q> {
    fn drop(&mut self) {
        if self.file_thread.is_some() || self.compress_thread.is_some() {
            self.stop();
        }
    }
}
