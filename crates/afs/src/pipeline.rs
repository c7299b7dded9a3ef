//! State shared by the facade and both workers, plus the hand-off rules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use afs_core::codec::Codec;
use afs_core::heap::Heap;
use afs_core::queue::JobQueue;

use log::debug;

use crate::config::FsConfig;
use crate::work::WorkHandle;
use crate::{compress_worker, file_worker};

pub(crate) struct Pipeline<Q> {
    pub file_queue: Q,
    pub compress_queue: Q,
    pub heap: Arc<dyn Heap>,
    pub codec: Arc<dyn Codec>,
    pub config: FsConfig,
    /// Cleared once the compression worker has been joined; later
    /// decompression stages run inline.
    compressor_online: AtomicBool,
}

impl<Q: JobQueue<WorkHandle>> Pipeline<Q> {
    pub fn new(
        config: FsConfig,
        heap: Arc<dyn Heap>,
        codec: Arc<dyn Codec>,
        file_queue: Q,
        compress_queue: Q,
    ) -> Self {
        Self {
            file_queue,
            compress_queue,
            heap,
            codec,
            config,
            compressor_online: AtomicBool::new(true),
        }
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.config.buffer_align
    }

    pub fn set_compressor_offline(&self) {
        self.compressor_online.store(false, Ordering::Release);
    }

    /// File worker → compression worker. Never blocks: a full compression
    /// queue means the stage runs here, on the caller's thread.
    pub fn hand_to_compressor(&self, work: WorkHandle) {
        if !self.compressor_online.load(Ordering::Acquire) {
            compress_worker::process(self, work);
            return;
        }
        if let Err(Some(work)) = self.compress_queue.try_push(Some(work)) {
            debug!("compress queue full, running codec stage for {} inline", work.path());
            compress_worker::process(self, work);
        }
    }

    /// Compression worker → file worker, for deferred writes. Never
    /// blocks: a full file queue means the disk write runs here.
    pub fn hand_to_file_worker(&self, work: WorkHandle) {
        if let Err(Some(work)) = self.file_queue.try_push(Some(work)) {
            debug!("file queue full, writing {} inline", work.path());
            file_worker::process(self, work);
        }
    }

    /// Run whatever is still queued for the file worker on this thread.
    /// Used at shutdown, after both workers have exited.
    pub fn drain_file_queue(&self) -> usize {
        let mut drained = 0;
        while let Some(slot) = self.file_queue.try_pop() {
            if let Some(work) = slot {
                file_worker::process(self, work);
                drained += 1;
            }
        }
        drained
    }
}
