// Pipeline configuration.

use crate::error::ArchiveError;
use crate::format::CHUNK_SIZE;
use crate::safe_output::AliasPolicy;

use super::block::BlockCodec;

/// Configuration shared by the encoder, the decoder and the file helpers.
///
/// The chunk size is not recorded in the archive, so an archive can only be
/// decoded with the chunk size it was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Uncompressed bytes per frame (every frame but the last).
    pub chunk_size: usize,
    /// How input and output paths are compared to detect in-place runs.
    pub alias_policy: AliasPolicy,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            alias_policy: AliasPolicy::default(),
        }
    }
}

impl ArchiveOptions {
    /// Options with a non-default chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    /// Check the options against a codec's limits.
    ///
    /// Returns the compressed-frame bound for the chunk size.
    pub fn validate<C: BlockCodec>(&self, codec: &C) -> Result<usize, ArchiveError> {
        if self.chunk_size == 0 {
            return Err(ArchiveError::InvalidOptions(
                "chunk size must be non-zero".into(),
            ));
        }
        if self.chunk_size > codec.max_input_size() {
            return Err(ArchiveError::InvalidOptions(format!(
                "chunk size {} exceeds the {} block limit of {}",
                self.chunk_size,
                codec.name(),
                codec.max_input_size()
            )));
        }
        let bound = codec.compress_bound(self.chunk_size);
        if u32::try_from(bound).is_err() {
            return Err(ArchiveError::InvalidOptions(format!(
                "compressed bound {bound} for chunk size {} does not fit a frame length",
                self.chunk_size
            )));
        }
        Ok(bound)
    }
}
