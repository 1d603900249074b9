// Chunked compression pipelines.
//
// This module provides the streaming encode/decode API for archives,
// building on the container format in `format`:
//
// - `block`: BlockCodec, the single-buffer primitive (LZ4 via lz4_flex)
// - `encoder`: ArchiveEncoder, chunk the input, one frame per chunk
// - `decoder`: ArchiveDecoder, one-frame lookahead, final-chunk discovery
// - `options`: ArchiveOptions, chunk size and path-aliasing policy
// - `buffer`: fixed-size buffers reused across chunks

pub mod block;
mod buffer;
pub mod decoder;
pub mod encoder;
pub mod options;

pub use block::{BlockCodec, BlockError, Lz4Block};
pub use decoder::ArchiveDecoder;
pub use encoder::{ArchiveEncoder, EncodeSummary};
pub use options::ArchiveOptions;
