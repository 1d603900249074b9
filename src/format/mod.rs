// Archive container format.
//
// The on-disk layout shared by the encoder and the decoder:
//
// - `header`: 4-byte little-endian magic number and endianness helpers
// - `frame`: length-prefixed frames holding one compressed chunk each

pub mod frame;
pub mod header;

// Re-export key types for convenience.
pub use frame::{
    FrameError, LENGTH_PREFIX_SIZE, read_frame_length, read_frame_payload, read_full, write_frame,
};
pub use header::{
    ARCHIVE_MAGIC, MAGIC_SIZE, Magic, from_little_endian, read_magic, to_little_endian,
    write_magic,
};

/// Nominal uncompressed chunk size (8 MiB).
///
/// Every frame except the last decompresses to exactly this many bytes.
pub const CHUNK_SIZE: usize = 8 << 20;
