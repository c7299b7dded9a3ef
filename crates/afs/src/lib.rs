//! # afs
//!
//! Asynchronous file reads and writes with an optional background
//! compression stage.
//!
//! ```text
//!            write(compress)                     read(decompress)
//! caller ──► compress queue ──► [compress] ──┐   caller ──► file queue ──► [file] ──┐
//!    ▲            (caller waits on stage)    │                                      │
//!    └──────────── file queue ◄──────────────┘   [compress] ◄── compress queue ◄────┘
//!                      │                              │
//!                   [file] ── done                    └── terminator, done
//! ```
//!
//! Two dedicated threads: the file worker does disk I/O, the compression
//! worker runs the codec. A job crosses between them at most once.
//! Neither worker ever blocks on the other: hand-offs use `try_push` and
//! run the next stage inline when the target queue is full.
//!
//! ## Modules
//!
//! - `config` - `FsConfig` and its environment overrides
//! - `work` - work items and the caller-facing `WorkHandle`
//! - `fs` - the `FileSystem` facade (submission, lifecycle)
//! - `file_worker` / `compress_worker` - the two worker loops

mod compress_worker;
mod file_worker;
mod pipeline;

pub mod config;
pub mod fs;
pub mod work;

pub use afs_core::{CompressionIntent, FsError, Heap, HeapBuf, JobPath, WorkOp};
pub use afs_module::{Lz4Codec, TrackedHeap};
pub use config::FsConfig;
pub use fs::FileSystem;
pub use work::{is_done, WorkHandle};
