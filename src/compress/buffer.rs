// Fixed-size chunk buffers.
//
// Each pipeline owns exactly two buffers for its whole lifetime: one for raw
// chunk bytes and one for a compressed frame payload. They are allocated once
// with fallible reservation and never resized.

use crate::error::ArchiveError;

/// Allocate a zeroed buffer of exactly `len` bytes.
///
/// Allocation failure is reported as `OutOfMemory` instead of aborting.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ArchiveError::OutOfMemory { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// The raw/packed buffer pair reused across every chunk.
pub(crate) struct ChunkBuffers {
    /// Uncompressed chunk, `chunk_size` bytes.
    pub raw: Vec<u8>,
    /// Compressed payload, `compress_bound(chunk_size)` bytes.
    pub packed: Vec<u8>,
}

impl ChunkBuffers {
    pub(crate) fn new(chunk_size: usize, bound: usize) -> Result<Self, ArchiveError> {
        let raw = alloc_buffer(chunk_size)?;
        let packed = alloc_buffer(bound)?;
        log::trace!("allocated chunk buffers: raw={chunk_size} packed={bound}");
        Ok(Self { raw, packed })
    }
}
