//! Codec abstraction.
//!
//! A `Codec` is the byte transform run by the compression worker. It
//! knows nothing about framing: the length header is added and checked by
//! `afs_module::frame`.
//!
//! # Implementors
//!
//! - `Lz4Codec` (default): LZ4 block format via `lz4_flex`.

use thiserror::Error;

/// Non-fatal codec failure. The pipeline falls back to the untransformed
/// buffer and never reports these through a job's result code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("output buffer too small")]
    OutputTooSmall,
    #[error("corrupt payload: {0}")]
    Corrupt(String),
    #[error("invalid frame: {0}")]
    Frame(&'static str),
    #[error("length mismatch: header says {expected}, codec produced {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("frame buffer allocation failed")]
    Alloc,
}

/// Block compressor.
///
/// **Contract:**
/// - `compress()` writes into `dst` and returns the compressed length;
///   it must fail (not truncate) when `dst` is too small.
/// - `decompress()` writes into `dst` and returns the produced length.
/// - Both are pure functions of their input; implementors are shared
///   across threads.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;

    /// Worst-case compressed size for `src_len` input bytes.
    fn max_compressed_len(&self, src_len: usize) -> usize;
}
