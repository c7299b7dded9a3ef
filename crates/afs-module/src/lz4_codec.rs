//! `Lz4Codec`: default `Codec` implementation.
//!
//! LZ4 block format (no frame, no checksum) via `lz4_flex`. The block
//! carries no length of its own; `frame` stores it in front.

use afs_core::codec::{Codec, CodecError};

use lz4_flex::block;

#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Codec;

impl Lz4Codec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        // An empty block is zero bytes.
        if src.is_empty() {
            return Ok(0);
        }
        if dst.len() >= block::get_maximum_output_size(src.len()) {
            return block::compress_into(src, dst).map_err(|_| CodecError::OutputTooSmall);
        }
        // compress_into may refuse anything below the worst-case bound, so
        // tight destinations go through a scratch block. That scratch is
        // plain process memory, not `Heap`; `frame` always passes the full
        // bound and never takes this path.
        let packed = block::compress(src);
        let out = dst.get_mut(..packed.len()).ok_or(CodecError::OutputTooSmall)?;
        out.copy_from_slice(&packed);
        Ok(packed.len())
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        if src.is_empty() {
            return Ok(0);
        }
        block::decompress_into(src, dst).map_err(|e| CodecError::Corrupt(e.to_string()))
    }

    fn max_compressed_len(&self, src_len: usize) -> usize {
        block::get_maximum_output_size(src_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};

    fn round_trip(codec: &Lz4Codec, src: &[u8]) -> Vec<u8> {
        let mut packed = vec![0u8; codec.max_compressed_len(src.len())];
        let n = codec.compress(src, &mut packed).unwrap();
        let mut out = vec![0u8; src.len()];
        let m = codec.decompress(&packed[..n], &mut out).unwrap();
        assert_eq!(m, src.len());
        out
    }

    #[test]
    fn test_round_trip_empty() {
        assert!(round_trip(&Lz4Codec, &[]).is_empty());
    }

    #[test]
    fn test_round_trip_pattern() {
        let src: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(round_trip(&Lz4Codec, &src), src);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xAF5);
        let mut src = vec![0u8; 4096];
        rng.fill_bytes(&mut src);
        assert_eq!(round_trip(&Lz4Codec, &src), src);
    }

    #[test]
    fn test_tight_destination_that_fits() {
        let src: Vec<u8> = (0..4096u32).map(|i| (i % 17) as u8).collect();
        let mut dst = vec![0u8; src.len()];
        let n = Lz4Codec.compress(&src, &mut dst).unwrap();
        assert!(n < src.len());
        let mut out = vec![0u8; src.len()];
        assert_eq!(Lz4Codec.decompress(&dst[..n], &mut out).unwrap(), src.len());
        assert_eq!(out, src);
    }

    #[test]
    fn test_random_does_not_fit_in_source_len() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut src = vec![0u8; 1024];
        rng.fill_bytes(&mut src);
        let mut dst = vec![0u8; src.len()];
        assert_eq!(Lz4Codec.compress(&src, &mut dst), Err(CodecError::OutputTooSmall));
    }

    #[test]
    fn test_corrupt_input_rejected() {
        let mut out = vec![0u8; 64];
        // Token promises 15+ literals that are not there.
        let bad = [0xF0, 0xFF, 0xFF, 0x01];
        assert!(matches!(
            Lz4Codec.decompress(&bad, &mut out),
            Err(CodecError::Corrupt(_))
        ));
    }
}
