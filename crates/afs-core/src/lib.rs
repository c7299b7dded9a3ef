//! # afs-core: Trait definitions for AFS
//!
//! AFS moves file reads and writes off the calling thread and optionally
//! pipes payloads through a background compression stage. This crate
//! defines the seams every other AFS crate programs against:
//!
//! | Trait              | Capability                               | Default impl (afs-module) |
//! |--------------------|------------------------------------------|---------------------------|
//! | `Heap`             | aligned buffer allocation + accounting   | `TrackedHeap`             |
//! | `JobQueue`         | bounded blocking MPMC queue w/ sentinel  | `BoundedQueue`            |
//! | `CompletionSignal` | one-shot multi-waiter gate               | `EventSignal`             |
//! | `Codec`            | block compress / decompress              | `Lz4Codec`                |
//!
//! No pipeline logic lives here. The `afs` crate wires the defaults into
//! the two-worker pipeline.

pub mod entry;
pub mod heap;
pub mod queue;
pub mod signal;
pub mod codec;
pub mod env;
pub mod error;

pub use codec::{Codec, CodecError};
pub use entry::{CompressionIntent, JobPath, WorkOp};
pub use error::{FsError, Result};
pub use heap::{Heap, HeapBuf};
pub use queue::JobQueue;
pub use signal::CompletionSignal;
