// File-level I/O helpers for archive encoding/decoding.
//
// Provides `encode_file()` and `decode_file()` convenience functions that
// wrap the streaming pipelines with buffered I/O and the output safety
// wrapper (in-place runs go through a temporary file). Optionally computes
// streaming SHA-256 checksums of the uncompressed data (feature-gated behind
// `file-io`); these are reported, never stored in the archive.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::compress::block::{BlockCodec, Lz4Block};
use crate::compress::decoder::ArchiveDecoder;
use crate::compress::encoder::ArchiveEncoder;
use crate::compress::options::ArchiveOptions;
use crate::error::{ArchiveError, Corruption};
use crate::format::{self, LENGTH_PREFIX_SIZE, MAGIC_SIZE, Magic};
use crate::safe_output::with_safe_output;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Uncompressed input size in bytes.
    pub input_size: u64,
    /// Archive size in bytes, including the magic number.
    pub archive_size: u64,
    /// Number of frames written.
    pub frames: u64,
    /// SHA-256 of the input (if `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
}

impl EncodeStats {
    /// Archive size as a fraction of the input size (0 for empty input).
    pub fn compression_ratio(&self) -> f64 {
        ratio(self.archive_size, self.input_size)
    }
}

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Archive size in bytes.
    pub archive_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of frames decoded.
    pub frames: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

impl DecodeStats {
    /// Archive size as a fraction of the output size (0 for empty output).
    pub fn compression_ratio(&self) -> f64 {
        ratio(self.archive_size, self.output_size)
    }
}

fn ratio(archive: u64, raw: u64) -> f64 {
    if raw == 0 {
        0.0
    } else {
        archive as f64 / raw as f64
    }
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

fn open_input(path: &Path) -> Result<File, ArchiveError> {
    File::open(path).map_err(|source| ArchiveError::OpenInput {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// encode_file
// ---------------------------------------------------------------------------

/// Compress `input_path` into an archive at `output_path`.
///
/// `output_path` may name the same file as `input_path`; the archive then
/// replaces the input only once it is complete. On failure no partial
/// archive is left behind.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    opts: ArchiveOptions,
) -> Result<EncodeStats, ArchiveError> {
    encode_file_with_codec(input_path, output_path, Lz4Block, opts)
}

/// `encode_file()` with a custom block codec.
pub fn encode_file_with_codec<C: BlockCodec>(
    input_path: &Path,
    output_path: &Path,
    codec: C,
    opts: ArchiveOptions,
) -> Result<EncodeStats, ArchiveError> {
    let input = open_input(input_path)?;

    with_safe_output(
        Some(input_path),
        output_path,
        opts.alias_policy,
        move |file| {
            #[cfg(feature = "file-io")]
            let mut reader = HashingReader::new(input);
            #[cfg(not(feature = "file-io"))]
            let mut reader = input;

            let writer = BufWriter::with_capacity(BUF_SIZE, file);
            let mut encoder = ArchiveEncoder::with_codec(writer, codec, opts)?;
            encoder.encode_from(&mut reader)?;
            let (writer, summary) = encoder.finish()?;
            writer.into_inner().map_err(|e| e.into_error())?;

            #[cfg(feature = "file-io")]
            let input_sha256 = Some(reader.finalize());
            #[cfg(not(feature = "file-io"))]
            let input_sha256: Option<[u8; 32]> = None;

            Ok(EncodeStats {
                input_size: summary.bytes_in,
                archive_size: summary.bytes_out,
                frames: summary.frames,
                input_sha256,
            })
        },
    )
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decompress the archive at `input_path` into `output_path`.
///
/// Same aliasing and cleanup behavior as `encode_file()`.
pub fn decode_file(
    input_path: &Path,
    output_path: &Path,
    opts: ArchiveOptions,
) -> Result<DecodeStats, ArchiveError> {
    decode_file_with_codec(input_path, output_path, Lz4Block, opts)
}

/// `decode_file()` with a custom block codec.
pub fn decode_file_with_codec<C: BlockCodec>(
    input_path: &Path,
    output_path: &Path,
    codec: C,
    opts: ArchiveOptions,
) -> Result<DecodeStats, ArchiveError> {
    let input = open_input(input_path)?;
    let archive_size = input.metadata()?.len();

    with_safe_output(
        Some(input_path),
        output_path,
        opts.alias_policy,
        move |file| {
            let reader = BufReader::with_capacity(BUF_SIZE, input);
            let mut decoder = ArchiveDecoder::with_codec(reader, codec, opts)?;
            let mut writer = BufWriter::with_capacity(BUF_SIZE, file);

            #[cfg(feature = "file-io")]
            let (output_size, output_sha256) = {
                let mut hashing_writer = HashingWriter::new(&mut writer);
                let n = decoder.decode_to(&mut hashing_writer)?;
                (n, Some(hashing_writer.finalize()))
            };
            #[cfg(not(feature = "file-io"))]
            let (output_size, output_sha256) = (decoder.decode_to(&mut writer)?, None);

            writer.into_inner().map_err(|e| e.into_error())?;

            Ok(DecodeStats {
                archive_size,
                output_size,
                frames: decoder.frames_decoded(),
                output_sha256,
            })
        },
    )
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

/// Location and size of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Offset of the frame's length prefix from the start of the archive.
    pub offset: u64,
    /// Payload length from the prefix.
    pub compressed_size: u32,
}

/// Frame table of an archive, gathered without decompressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub frames: Vec<FrameInfo>,
    pub archive_size: u64,
    pub chunk_size: usize,
}

impl ArchiveInfo {
    /// Bounds on the decompressed size: every frame but the last is a full
    /// chunk, the last holds between 0 and `chunk_size` bytes.
    pub fn original_size_range(&self) -> (u64, u64) {
        let n = self.frames.len() as u64;
        let chunk = self.chunk_size as u64;
        (n.saturating_sub(1) * chunk, n * chunk)
    }
}

/// Walk an archive's frames, skipping their payloads.
pub fn inspect<R: Read>(reader: R, opts: ArchiveOptions) -> Result<ArchiveInfo, ArchiveError> {
    inspect_with_codec(reader, &Lz4Block, opts)
}

/// `inspect()` for an archive written with a custom block codec.
///
/// Frame lengths are checked against the codec's bound for the chunk size.
pub fn inspect_with_codec<R: Read, C: BlockCodec>(
    mut reader: R,
    codec: &C,
    opts: ArchiveOptions,
) -> Result<ArchiveInfo, ArchiveError> {
    let bound = opts.validate(codec)?;
    match format::read_magic(&mut reader)? {
        Magic::Valid => {}
        other => return Err(ArchiveError::InvalidArchive(other)),
    }

    let mut offset = MAGIC_SIZE as u64;
    let mut frames = Vec::new();
    loop {
        let frame = frames.len() as u64;
        let len = match format::read_frame_length(&mut reader)
            .map_err(|e| ArchiveError::from_frame(frame, e))?
        {
            Some(len) => len,
            None => break,
        };
        if len as usize > bound {
            return Err(ArchiveError::CorruptedArchive {
                frame,
                kind: Corruption::OversizedFrame { len, bound },
            });
        }
        let skipped = io::copy(&mut (&mut reader).take(u64::from(len)), &mut io::sink())?;
        if skipped < u64::from(len) {
            return Err(ArchiveError::CorruptedArchive {
                frame,
                kind: Corruption::TruncatedPayload {
                    expected: len,
                    got: skipped as usize,
                },
            });
        }
        frames.push(FrameInfo {
            offset,
            compressed_size: len,
        });
        offset += (LENGTH_PREFIX_SIZE as u64) + u64::from(len);
    }

    Ok(ArchiveInfo {
        frames,
        archive_size: offset,
        chunk_size: opts.chunk_size,
    })
}

/// `inspect()` on a file.
pub fn inspect_file(path: &Path, opts: ArchiveOptions) -> Result<ArchiveInfo, ArchiveError> {
    let file = open_input(path)?;
    inspect(BufReader::with_capacity(BUF_SIZE, file), opts)
}

// ---------------------------------------------------------------------------
// Hashing adapters (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingReader<R: Read> {
    inner: R,
    hasher: sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: sha2::Sha256::new(),
        }
    }

    fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

#[cfg(feature = "file-io")]
impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<'a, W: Write> HashingWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            hasher: sha2::Sha256::new(),
        }
    }

    fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
