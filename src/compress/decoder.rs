// Streaming archive decoder.
//
// ArchiveDecoder reconstructs the original stream one chunk at a time. The
// archive has no end marker, so the decoder reads one length prefix ahead:
// a frame is the last one only if no further length prefix follows it.
//
//   HaveCurrentLength(len) -- payload read, next prefix found  --> write full chunk
//          |
//          +---------------- payload read, stream ended ------> Draining(len)
//
//   Draining(len) -- size-discovering decompression, write, done

use std::io::{self, Read, Write};

use crate::error::{ArchiveError, Corruption};
use crate::format::{self, Magic};

use super::block::{BlockCodec, BlockError, Lz4Block};
use super::buffer::ChunkBuffers;
use super::options::ArchiveOptions;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header not read yet.
    Start,
    /// A frame of this payload length is next; its finality is unknown.
    HaveCurrentLength(u32),
    /// The payload now in the packed buffer belongs to the last frame.
    Draining(u32),
    /// All output written.
    Finished,
    /// A previous call failed; every later call fails too.
    Failed,
}

// ---------------------------------------------------------------------------
// ArchiveDecoder
// ---------------------------------------------------------------------------

/// Streaming archive decoder with progress tracking.
///
/// Only one chunk is held in memory at a time.
pub struct ArchiveDecoder<R: Read, C: BlockCodec = Lz4Block> {
    reader: R,
    codec: C,
    bufs: ChunkBuffers,
    bound: usize,
    state: State,
    bytes_decoded: u64,
    frames_decoded: u64,
}

impl<R: Read> ArchiveDecoder<R, Lz4Block> {
    /// Create an LZ4 decoder. Allocates both chunk buffers up front.
    pub fn new(reader: R, opts: ArchiveOptions) -> Result<Self, ArchiveError> {
        Self::with_codec(reader, Lz4Block, opts)
    }
}

impl<R: Read, C: BlockCodec> ArchiveDecoder<R, C> {
    /// Create a decoder using a custom block codec.
    pub fn with_codec(reader: R, codec: C, opts: ArchiveOptions) -> Result<Self, ArchiveError> {
        let bound = opts.validate(&codec)?;
        let bufs = ChunkBuffers::new(opts.chunk_size, bound)?;
        Ok(Self {
            reader,
            codec,
            bufs,
            bound,
            state: State::Start,
            bytes_decoded: 0,
            frames_decoded: 0,
        })
    }

    /// Decode all frames, writing output to `writer`.
    ///
    /// Returns the total number of bytes decoded.
    pub fn decode_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64, ArchiveError> {
        while self.decode_chunk_to(writer)?.is_some() {}
        writer.flush()?;
        Ok(self.bytes_decoded)
    }

    /// Decode the next frame, writing its chunk to `writer`.
    ///
    /// Returns `Some(chunk_len)` if a frame was decoded, or `None` once the
    /// archive is exhausted. After an error every later call fails.
    pub fn decode_chunk_to<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
    ) -> Result<Option<usize>, ArchiveError> {
        let result = self.step(writer);
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    /// Total bytes decoded so far.
    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    /// Number of frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Consume the decoder, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn step<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<Option<usize>, ArchiveError> {
        loop {
            match self.state {
                State::Start => {
                    self.read_header()?;
                    self.state = match self.read_length()? {
                        Some(len) => State::HaveCurrentLength(len),
                        None => {
                            log::debug!("archive holds no frames");
                            State::Finished
                        }
                    };
                }
                State::HaveCurrentLength(len) => {
                    self.read_payload(len)?;
                    match self.read_length()? {
                        Some(next) => {
                            let n = self.decode_full_chunk(len)?;
                            self.emit(writer, n)?;
                            self.state = State::HaveCurrentLength(next);
                            return Ok(Some(n));
                        }
                        None => self.state = State::Draining(len),
                    }
                }
                State::Draining(len) => {
                    let n = self.decode_last_chunk(len)?;
                    self.emit(writer, n)?;
                    self.state = State::Finished;
                    log::debug!(
                        "decoded {} frames, {} bytes",
                        self.frames_decoded,
                        self.bytes_decoded
                    );
                    return Ok(Some(n));
                }
                State::Finished => return Ok(None),
                State::Failed => {
                    return Err(ArchiveError::Io(io::Error::other(
                        "decoder already failed on an earlier frame",
                    )));
                }
            }
        }
    }

    fn read_header(&mut self) -> Result<(), ArchiveError> {
        match format::read_magic(&mut self.reader)? {
            Magic::Valid => Ok(()),
            other => Err(ArchiveError::InvalidArchive(other)),
        }
    }

    fn read_length(&mut self) -> Result<Option<u32>, ArchiveError> {
        // The prefix being read belongs to the frame after the current one,
        // unless the header was just read.
        let frame = match self.state {
            State::Start => 0,
            _ => self.frames_decoded + 1,
        };
        let len = format::read_frame_length(&mut self.reader)
            .map_err(|e| ArchiveError::from_frame(frame, e))?;
        if let Some(len) = len {
            if len as usize > self.bound {
                return Err(ArchiveError::CorruptedArchive {
                    frame,
                    kind: Corruption::OversizedFrame {
                        len,
                        bound: self.bound,
                    },
                });
            }
        }
        Ok(len)
    }

    fn read_payload(&mut self, len: u32) -> Result<(), ArchiveError> {
        format::read_frame_payload(&mut self.reader, len, &mut self.bufs.packed)
            .map_err(|e| ArchiveError::from_frame(self.frames_decoded, e))
    }

    /// Decompress a non-final frame, which must fill a whole chunk.
    fn decode_full_chunk(&mut self, len: u32) -> Result<usize, ArchiveError> {
        let payload = &self.bufs.packed[..len as usize];
        self.codec
            .decompress_exact(payload, &mut self.bufs.raw)
            .map_err(|e| self.corrupted(e))?;
        Ok(self.bufs.raw.len())
    }

    /// Decompress the last frame, letting the codec discover its size.
    fn decode_last_chunk(&mut self, len: u32) -> Result<usize, ArchiveError> {
        let payload = &self.bufs.packed[..len as usize];
        self.codec
            .decompress(payload, &mut self.bufs.raw)
            .map_err(|e| self.corrupted(e))
    }

    fn corrupted(&self, err: BlockError) -> ArchiveError {
        let kind = match err {
            BlockError::Failed(msg) => Corruption::UndecodableBlock { msg },
            BlockError::SizeMismatch { expected, got } => {
                Corruption::WrongChunkSize { expected, got }
            }
        };
        ArchiveError::CorruptedArchive {
            frame: self.frames_decoded,
            kind,
        }
    }

    fn emit<W: Write + ?Sized>(&mut self, writer: &mut W, n: usize) -> Result<(), ArchiveError> {
        writer.write_all(&self.bufs.raw[..n])?;
        log::trace!("frame {}: {} bytes out", self.frames_decoded, n);
        self.bytes_decoded += n as u64;
        self.frames_decoded += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Decode an in-memory archive.
pub fn decode_all(archive: &[u8], opts: ArchiveOptions) -> Result<Vec<u8>, ArchiveError> {
    let mut out = Vec::new();
    decode(archive, &mut out, opts)?;
    Ok(out)
}

/// Decode an archive from `input`, writing the original stream to `output`.
///
/// Returns the number of bytes written to `output`.
pub fn decode<R: Read, W: Write + ?Sized>(
    input: R,
    output: &mut W,
    opts: ArchiveOptions,
) -> Result<u64, ArchiveError> {
    let mut decoder = ArchiveDecoder::new(input, opts)?;
    decoder.decode_to(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
