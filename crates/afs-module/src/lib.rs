//! # afs-module: Default (safe) implementations
//!
//! One default implementation for every `afs-core` trait. Each favours
//! correctness and simplicity; alternatives plug in through the traits.
//!
//! ## Default stack
//!
//! | Trait             | Default Impl   | Notes                                  |
//! |-------------------|----------------|----------------------------------------|
//! | Heap              | TrackedHeap    | mutex-guarded, reports leaks on drop   |
//! | JobQueue          | BoundedQueue   | ArrayQueue + condvar blocking          |
//! | CompletionSignal  | EventSignal    | atomic fast path, condvar for sleepers |
//! | Codec             | Lz4Codec       | LZ4 block format                       |
//!
//! `frame` adds the 4-byte length header around codec payloads.

pub mod tracked_heap;
pub mod bounded_queue;
pub mod event_signal;
pub mod lz4_codec;
pub mod frame;

pub use bounded_queue::BoundedQueue;
pub use event_signal::EventSignal;
pub use lz4_codec::Lz4Codec;
pub use tracked_heap::TrackedHeap;
