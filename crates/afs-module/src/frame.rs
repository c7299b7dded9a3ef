//! On-disk framing for compressed payloads.
//!
//! ```text
//! +----------------------+---------------------------+
//! | u32 LE original len  | codec payload             |
//! +----------------------+---------------------------+
//! ```
//!
//! Compression always gets the codec's worst-case room after the header,
//! so every payload frames, including empty and incompressible ones. A
//! file written with compression therefore always starts with a header.
//! Incompressible payloads come out a few bytes larger than they went in.

use afs_core::codec::{Codec, CodecError};
use afs_core::heap::{Heap, HeapBuf};

pub const HEADER_LEN: usize = 4;

/// Original length recorded in a frame header, if `frame` has one.
pub fn declared_len(frame: &[u8]) -> Option<usize> {
    let header: [u8; HEADER_LEN] = frame.get(..HEADER_LEN)?.try_into().ok()?;
    usize::try_from(u32::from_le_bytes(header)).ok()
}

/// Compress `src` into a new framed buffer from `heap`.
///
/// On failure the scratch buffer goes back to `heap` and `src` is
/// untouched.
pub fn compress(
    codec: &dyn Codec,
    heap: &dyn Heap,
    src: &[u8],
    align: usize,
) -> Result<HeapBuf, CodecError> {
    let original = u32::try_from(src.len()).map_err(|_| CodecError::Frame("payload exceeds u32 length"))?;
    let room = codec.max_compressed_len(src.len());
    let mut dst = heap
        .alloc(HEADER_LEN + room, align)
        .map_err(|_| CodecError::Alloc)?;

    match codec.compress(src, &mut dst[HEADER_LEN..]) {
        Ok(n) => {
            dst[..HEADER_LEN].copy_from_slice(&original.to_le_bytes());
            dst.set_len(HEADER_LEN + n);
            Ok(dst)
        }
        Err(e) => {
            heap.free(dst);
            Err(e)
        }
    }
}

/// Decompress a framed buffer into a new buffer from `heap`.
///
/// The result has `len() == declared` and `capacity() == declared + spare`,
/// leaving room for a terminator. Frames declaring more than `max_len`
/// bytes are rejected before anything is allocated.
pub fn decompress(
    codec: &dyn Codec,
    heap: &dyn Heap,
    frame: &[u8],
    spare: usize,
    max_len: usize,
    align: usize,
) -> Result<HeapBuf, CodecError> {
    let declared = declared_len(frame).ok_or(CodecError::Frame("shorter than length header"))?;
    if declared > max_len {
        return Err(CodecError::Frame("declared length exceeds limit"));
    }
    let mut dst = heap
        .alloc(declared + spare, align)
        .map_err(|_| CodecError::Alloc)?;
    dst.set_len(declared);

    match codec.decompress(&frame[HEADER_LEN..], &mut dst) {
        Ok(n) if n == declared => Ok(dst),
        Ok(n) => {
            heap.free(dst);
            Err(CodecError::LengthMismatch { expected: declared, actual: n })
        }
        Err(e) => {
            heap.free(dst);
            Err(e)
        }
    }
}
