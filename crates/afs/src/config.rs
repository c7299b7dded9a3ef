//! Pipeline configuration

use afs_core::env::{env_or, env_parse};
use afs_core::error::{FsError, Result};

/// Configuration for a `FileSystem`
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Capacity of each of the two job queues (default: 64)
    pub queue_capacity: usize,

    /// Largest original length a compressed frame may declare (default: 256 MiB)
    pub max_decompressed_len: usize,

    /// Alignment of every buffer the pipeline allocates (default: 8)
    pub buffer_align: usize,

    /// Worker thread names are `{prefix}-file` and `{prefix}-compress`
    pub thread_name_prefix: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_decompressed_len: 256 * 1024 * 1024,
            buffer_align: 8,
            thread_name_prefix: "afs".to_string(),
        }
    }
}

impl FsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `AFS_QUEUE_CAPACITY`, `AFS_MAX_DECOMPRESSED_LEN`,
    /// `AFS_BUFFER_ALIGN` and `AFS_THREAD_PREFIX` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = env_parse("AFS_QUEUE_CAPACITY") {
            config.queue_capacity = n;
        }
        if let Some(n) = env_parse("AFS_MAX_DECOMPRESSED_LEN") {
            config.max_decompressed_len = n;
        }
        if let Some(n) = env_parse("AFS_BUFFER_ALIGN") {
            config.buffer_align = n;
        }
        config.thread_name_prefix = env_or("AFS_THREAD_PREFIX", config.thread_name_prefix);
        config
    }

    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    pub fn max_decompressed_len(mut self, n: usize) -> Self {
        self.max_decompressed_len = n;
        self
    }

    pub fn buffer_align(mut self, n: usize) -> Self {
        self.buffer_align = n;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(FsError::Config("queue_capacity must be at least 1".into()));
        }
        if !self.buffer_align.is_power_of_two() {
            return Err(FsError::Config(format!(
                "buffer_align {} is not a power of two",
                self.buffer_align
            )));
        }
        if self.max_decompressed_len > u32::MAX as usize {
            return Err(FsError::Config(
                "max_decompressed_len cannot exceed the u32 frame header".into(),
            ));
        }
        Ok(())
    }
}
