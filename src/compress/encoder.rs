// Streaming archive encoder.
//
// ArchiveEncoder splits its input into fixed-size chunks and writes one
// frame per chunk:
//   - The magic number is written before the first frame (or on finish)
//   - Input can be pulled from a reader or pushed via write_input()
//   - Each full chunk is compressed and written immediately
//   - Constant memory: one raw chunk buffer and one payload buffer

use std::io::{Read, Write};

use crate::error::ArchiveError;
use crate::format::{self, LENGTH_PREFIX_SIZE, MAGIC_SIZE};

use super::block::{BlockCodec, Lz4Block};
use super::buffer::ChunkBuffers;
use super::options::ArchiveOptions;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Totals reported by [`ArchiveEncoder::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Uncompressed bytes consumed.
    pub bytes_in: u64,
    /// Archive bytes written, including the magic number.
    pub bytes_out: u64,
    /// Number of frames written.
    pub frames: u64,
}

// ---------------------------------------------------------------------------
// ArchiveEncoder
// ---------------------------------------------------------------------------

/// Streaming archive encoder.
///
/// # Example
/// ```no_run
/// use lz4arc::compress::encoder::ArchiveEncoder;
/// use lz4arc::compress::ArchiveOptions;
///
/// let mut output = Vec::new();
/// let mut enc = ArchiveEncoder::new(&mut output, ArchiveOptions::default()).unwrap();
/// enc.write_input(b"some data").unwrap();
/// enc.finish().unwrap();
/// ```
pub struct ArchiveEncoder<W: Write, C: BlockCodec = Lz4Block> {
    writer: W,
    codec: C,
    bufs: ChunkBuffers,
    /// Bytes currently staged in `bufs.raw`.
    filled: usize,
    header_written: bool,
    summary: EncodeSummary,
}

impl<W: Write> ArchiveEncoder<W, Lz4Block> {
    /// Create an LZ4 encoder. Allocates both chunk buffers up front.
    pub fn new(writer: W, opts: ArchiveOptions) -> Result<Self, ArchiveError> {
        Self::with_codec(writer, Lz4Block, opts)
    }
}

impl<W: Write, C: BlockCodec> ArchiveEncoder<W, C> {
    /// Create an encoder using a custom block codec.
    pub fn with_codec(writer: W, codec: C, opts: ArchiveOptions) -> Result<Self, ArchiveError> {
        let bound = opts.validate(&codec)?;
        let bufs = ChunkBuffers::new(opts.chunk_size, bound)?;
        Ok(Self {
            writer,
            codec,
            bufs,
            filled: 0,
            header_written: false,
            summary: EncodeSummary::default(),
        })
    }

    /// Pull the whole of `reader` through the encoder.
    ///
    /// Each read asks for the rest of the current chunk; a read that comes
    /// back short is treated as end of input only once it returns nothing.
    /// Returns the number of bytes consumed from `reader`.
    pub fn encode_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<u64, ArchiveError> {
        self.ensure_header()?;
        let mut consumed = 0u64;
        loop {
            let n = format::read_full(reader, &mut self.bufs.raw[self.filled..])?;
            if n == 0 {
                break;
            }
            self.filled += n;
            consumed += n as u64;
            self.summary.bytes_in += n as u64;
            if self.filled == self.bufs.raw.len() {
                self.flush_chunk()?;
            }
        }
        Ok(consumed)
    }

    /// Push input bytes. Every completed chunk is written as a frame.
    pub fn write_input(&mut self, mut data: &[u8]) -> Result<(), ArchiveError> {
        self.ensure_header()?;
        while !data.is_empty() {
            let room = self.bufs.raw.len() - self.filled;
            let take = room.min(data.len());
            self.bufs.raw[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            self.summary.bytes_in += take as u64;
            data = &data[take..];
            if self.filled == self.bufs.raw.len() {
                self.flush_chunk()?;
            }
        }
        Ok(())
    }

    /// Write the final (possibly short) chunk and flush the writer.
    ///
    /// Empty input produces an archive holding only the magic number.
    pub fn finish(mut self) -> Result<(W, EncodeSummary), ArchiveError> {
        self.ensure_header()?;
        if self.filled > 0 {
            self.flush_chunk()?;
        }
        self.writer.flush()?;
        log::debug!(
            "encoded {} bytes into {} frames ({} archive bytes)",
            self.summary.bytes_in,
            self.summary.frames,
            self.summary.bytes_out
        );
        Ok((self.writer, self.summary))
    }

    /// Uncompressed bytes consumed so far.
    pub fn bytes_in(&self) -> u64 {
        self.summary.bytes_in
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.summary.frames
    }

    fn ensure_header(&mut self) -> Result<(), ArchiveError> {
        if !self.header_written {
            format::write_magic(&mut self.writer)?;
            self.header_written = true;
            self.summary.bytes_out += MAGIC_SIZE as u64;
        }
        Ok(())
    }

    fn flush_chunk(&mut self) -> Result<(), ArchiveError> {
        let raw = &self.bufs.raw[..self.filled];
        let packed_len = self
            .codec
            .compress(raw, &mut self.bufs.packed)
            .map_err(|e| ArchiveError::Codec {
                codec: self.codec.name(),
                msg: e.to_string(),
            })?;
        let payload = self
            .bufs
            .packed
            .get(..packed_len)
            .ok_or_else(|| ArchiveError::Codec {
                codec: self.codec.name(),
                msg: format!("compressed length {packed_len} exceeds the output buffer"),
            })?;
        format::write_frame(&mut self.writer, payload)?;
        log::trace!(
            "frame {}: {} -> {} bytes",
            self.summary.frames,
            self.filled,
            packed_len
        );
        self.summary.frames += 1;
        self.summary.bytes_out += (LENGTH_PREFIX_SIZE + packed_len) as u64;
        self.filled = 0;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encode an in-memory buffer, writing the archive to `output`.
pub fn encode_all<W: Write>(
    output: W,
    data: &[u8],
    opts: ArchiveOptions,
) -> Result<EncodeSummary, ArchiveError> {
    let mut encoder = ArchiveEncoder::new(output, opts)?;
    encoder.write_input(data)?;
    let (_, summary) = encoder.finish()?;
    Ok(summary)
}

/// Encode everything `input` yields, writing the archive to `output`.
///
/// Returns the number of archive bytes written.
pub fn encode<R: Read, W: Write>(
    input: &mut R,
    output: W,
    opts: ArchiveOptions,
) -> Result<u64, ArchiveError> {
    let mut encoder = ArchiveEncoder::new(output, opts)?;
    encoder.encode_from(input)?;
    let (_, summary) = encoder.finish()?;
    Ok(summary.bytes_out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
