// Single-buffer block compression primitive.
//
// Provides a pluggable `BlockCodec` trait with the built-in LZ4 block
// implementation (via lz4_flex). The archive pipelines only ever call these
// operations on whole chunks held in preallocated buffers:
//
//   - compress_bound: output capacity needed for a given input length
//   - compress: compress a chunk into a caller-provided buffer
//   - decompress: decompress when the output size is not known
//   - decompress_exact: decompress when the output size is known

/// Largest input a single LZ4 block may hold (LZ4_MAX_INPUT_SIZE).
pub const LZ4_MAX_INPUT_SIZE: usize = 0x7E00_0000;

/// Block-level failure reported by a codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("{0}")]
    Failed(String),
    #[error("decompressed {got} bytes, expected {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// BlockCodec trait
// ---------------------------------------------------------------------------

/// A compression primitive operating on one in-memory block at a time.
///
/// # Implementing a custom codec
///
/// ```no_run
/// use lz4arc::compress::block::{BlockCodec, BlockError};
///
/// struct Store;
///
/// impl BlockCodec for Store {
///     fn name(&self) -> &'static str { "store" }
///     fn compress_bound(&self, input_len: usize) -> usize { input_len }
///     fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
///         dst[..src.len()].copy_from_slice(src);
///         Ok(src.len())
///     }
///     fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
///         let out = dst
///             .get_mut(..src.len())
///             .ok_or_else(|| BlockError::Failed("output too small".into()))?;
///         out.copy_from_slice(src);
///         Ok(src.len())
///     }
/// }
/// ```
pub trait BlockCodec {
    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// Worst-case compressed size for `input_len` bytes of input.
    fn compress_bound(&self, input_len: usize) -> usize;

    /// Largest input the codec accepts in one block.
    fn max_input_size(&self) -> usize {
        usize::MAX
    }

    /// Compress `src` into `dst`, returning the compressed length.
    ///
    /// `dst` holds at least `compress_bound(src.len())` bytes.
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError>;

    /// Decompress `src` into `dst`, discovering the output length from the
    /// payload. Returns the number of bytes written; never writes past
    /// `dst.len()`.
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError>;

    /// Decompress `src` into `dst`, which must be filled exactly.
    fn decompress_exact(&self, src: &[u8], dst: &mut [u8]) -> Result<(), BlockError> {
        let got = self.decompress(src, dst)?;
        if got != dst.len() {
            return Err(BlockError::SizeMismatch {
                expected: dst.len(),
                got,
            });
        }
        Ok(())
    }
}

impl<C: BlockCodec + ?Sized> BlockCodec for &C {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn compress_bound(&self, input_len: usize) -> usize {
        (**self).compress_bound(input_len)
    }
    fn max_input_size(&self) -> usize {
        (**self).max_input_size()
    }
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        (**self).compress(src, dst)
    }
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        (**self).decompress(src, dst)
    }
    fn decompress_exact(&self, src: &[u8], dst: &mut [u8]) -> Result<(), BlockError> {
        (**self).decompress_exact(src, dst)
    }
}

// ---------------------------------------------------------------------------
// LZ4 backend
// ---------------------------------------------------------------------------

/// LZ4 block format (no frame header, no checksum).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Block;

impl BlockCodec for Lz4Block {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress_bound(&self, input_len: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(input_len)
    }

    fn max_input_size(&self) -> usize {
        LZ4_MAX_INPUT_SIZE
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        lz4_flex::block::compress_into(src, dst)
            .map_err(|e| BlockError::Failed(format!("LZ4 compression failed: {e}")))
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        lz4_flex::block::decompress_into(src, dst)
            .map_err(|e| BlockError::Failed(format!("LZ4 decompression failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn compress_vec(data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; Lz4Block.compress_bound(data.len())];
        let n = Lz4Block.compress(data, &mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    fn lz4_roundtrip_unknown_size() {
        let data: Vec<u8> = b"block codec ".iter().copied().cycle().take(4096).collect();
        let packed = compress_vec(&data);
        assert!(packed.len() < data.len());

        let mut out = vec![0u8; 8192];
        let n = Lz4Block.decompress(&packed, &mut out).unwrap();
        assert_eq!(&out[..n], &data[..]);
    }

    #[test]
    fn lz4_exact_size() {
        let data = vec![7u8; 1000];
        let packed = compress_vec(&data);
        let mut out = vec![0u8; 1000];
        Lz4Block.decompress_exact(&packed, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn exact_rejects_short_output() {
        let packed = compress_vec(&[1u8; 100]);
        let mut out = vec![0u8; 200];
        let err = Lz4Block.decompress_exact(&packed, &mut out).unwrap_err();
        assert_eq!(
            err,
            BlockError::SizeMismatch {
                expected: 200,
                got: 100
            }
        );
    }

    #[test]
    fn decompress_never_overruns_capacity() {
        let packed = compress_vec(&[9u8; 4096]);
        let mut out = vec![0u8; 1024];
        assert!(Lz4Block.decompress(&packed, &mut out).is_err());
    }

    #[test]
    fn five_bytes_are_stored_as_literals() {
        assert_eq!(compress_vec(b"AAAAA"), [0x50, b'A', b'A', b'A', b'A', b'A']);
    }

    #[test]
    fn bound_covers_incompressible_input() {
        let mut state = 0x9E37_79B9u32;
        let data: Vec<u8> = (0..65536)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        let packed = compress_vec(&data);
        assert!(packed.len() <= Lz4Block.compress_bound(data.len()));
    }

    #[test]
    fn codec_by_reference() {
        fn bound<C: BlockCodec>(c: C) -> usize {
            c.compress_bound(100)
        }
        assert_eq!(bound(&Lz4Block), Lz4Block.compress_bound(100));
    }
}
