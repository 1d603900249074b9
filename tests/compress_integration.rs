// Integration tests for the archive pipelines and file helpers.
//
// Covers the full path: ArchiveEncoder -> archive stream -> ArchiveDecoder,
// in-place runs through the output safety wrapper, and the guarantee that
// failed runs leave neither partial output nor temporary files behind.

use std::cell::Cell;
use std::io::{self, BufWriter, Cursor, Read};
use std::path::Path;

use lz4arc::ArchiveError;
use lz4arc::compress::block::{BlockCodec, BlockError, Lz4Block};
use lz4arc::compress::decoder::{self, ArchiveDecoder};
use lz4arc::compress::encoder::{self, ArchiveEncoder};
use lz4arc::compress::ArchiveOptions;
use lz4arc::error::Corruption;
use lz4arc::io::{decode_file, decode_file_with_codec, encode_file, encode_file_with_codec};
use lz4arc::safe_output::{AliasPolicy, with_safe_output};
use tempfile::tempdir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn generate_data(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    let mut data = Vec::with_capacity(size);
    for _ in 0..size {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        data.push((state >> 33) as u8);
    }
    data
}

fn repetitive_data(pattern: &[u8], total: usize) -> Vec<u8> {
    pattern.iter().copied().cycle().take(total).collect()
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Serves `data` but fails with an I/O error once `fail_after` bytes are out.
struct BrokenReader<'a> {
    data: &'a [u8],
    pos: usize,
    fail_after: usize,
}

impl<'a> BrokenReader<'a> {
    fn new(data: &'a [u8], fail_after: usize) -> Self {
        Self {
            data,
            pos: 0,
            fail_after,
        }
    }
}

impl Read for BrokenReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.fail_after {
            return Err(io::Error::other("device went away"));
        }
        let end = self.fail_after.min(self.data.len()).min(self.pos + buf.len());
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(n)
    }
}

/// Encode from `reader` into `output` the way `encode_file()` does.
fn encode_through_safe_output<R: Read>(
    input: &Path,
    output: &Path,
    mut reader: R,
    opts: ArchiveOptions,
) -> Result<(), ArchiveError> {
    with_safe_output(Some(input), output, AliasPolicy::CaseSensitive, |file| {
        let mut encoder = ArchiveEncoder::new(BufWriter::new(file), opts)?;
        encoder.encode_from(&mut reader)?;
        let (writer, _) = encoder.finish()?;
        writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    })
}

/// LZ4, except that compressing the `fail_at`-th chunk fails.
struct FailingCodec {
    fail_at: usize,
    calls: Cell<usize>,
}

impl FailingCodec {
    fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            calls: Cell::new(0),
        }
    }
}

impl BlockCodec for FailingCodec {
    fn name(&self) -> &'static str {
        "failing"
    }
    fn compress_bound(&self, input_len: usize) -> usize {
        Lz4Block.compress_bound(input_len)
    }
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_at {
            return Err(BlockError::Failed("injected failure".into()));
        }
        Lz4Block.compress(src, dst)
    }
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        Lz4Block.decompress(src, dst)
    }
}

/// Reports a tiny bound but accepts any chunk size, so buffer allocation
/// for a huge chunk fails.
struct HungryCodec;

impl BlockCodec for HungryCodec {
    fn name(&self) -> &'static str {
        "hungry"
    }
    fn compress_bound(&self, input_len: usize) -> usize {
        input_len.min(1024)
    }
    fn compress(&self, _src: &[u8], _dst: &mut [u8]) -> Result<usize, BlockError> {
        Err(BlockError::Failed("never reached".into()))
    }
    fn decompress(&self, _src: &[u8], _dst: &mut [u8]) -> Result<usize, BlockError> {
        Err(BlockError::Failed("never reached".into()))
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_across_chunk_sizes() {
    let data = repetitive_data(b"chunked archive ", 100_000);
    for chunk_size in [1usize, 7, 64, 4096, 65_536, 1 << 20] {
        let opts = ArchiveOptions::with_chunk_size(chunk_size);
        let mut archive = Vec::new();
        let summary = encoder::encode_all(&mut archive, &data, opts).unwrap();
        assert_eq!(summary.frames as usize, data.len().div_ceil(chunk_size));
        assert_eq!(decoder::decode_all(&archive, opts).unwrap(), data);
    }
}

#[test]
fn incompressible_data_roundtrips() {
    let data = generate_data(300_000, 7);
    let opts = ArchiveOptions::with_chunk_size(64 * 1024);
    let mut archive = Vec::new();
    encoder::encode_all(&mut archive, &data, opts).unwrap();
    assert!(archive.len() > data.len());
    assert_eq!(decoder::decode_all(&archive, opts).unwrap(), data);
}

#[test]
fn streaming_decoder_chunk_by_chunk() {
    let data = generate_data(10_000, 3);
    let opts = ArchiveOptions::with_chunk_size(4096);
    let mut archive = Vec::new();
    encoder::encode_all(&mut archive, &data, opts).unwrap();

    let mut dec = ArchiveDecoder::new(Cursor::new(&archive), opts).unwrap();
    let mut out = Vec::new();
    let mut sizes = Vec::new();
    while let Some(n) = dec.decode_chunk_to(&mut out).unwrap() {
        sizes.push(n);
    }
    assert_eq!(sizes, [4096, 4096, 1808]);
    assert_eq!(out, data);
    assert_eq!(dec.bytes_decoded(), 10_000);
    assert_eq!(dec.frames_decoded(), 3);
}

#[test]
fn encoder_output_is_independent_of_write_pattern() {
    let data = generate_data(20_000, 11);
    let opts = ArchiveOptions::with_chunk_size(1000);
    let reference = {
        let mut out = Vec::new();
        encoder::encode_all(&mut out, &data, opts).unwrap();
        out
    };
    for piece in [1usize, 999, 1000, 1001, 7777] {
        let mut out = Vec::new();
        let mut enc = ArchiveEncoder::new(&mut out, opts).unwrap();
        for part in data.chunks(piece) {
            enc.write_input(part).unwrap();
        }
        enc.finish().unwrap();
        assert_eq!(out, reference, "piece={piece}");
    }
}

#[test]
fn flipped_payload_byte_is_reported() {
    let data = repetitive_data(b"abcdefgh", 50_000);
    let opts = ArchiveOptions::with_chunk_size(16_384);
    let mut archive = Vec::new();
    encoder::encode_all(&mut archive, &data, opts).unwrap();

    // Corrupt the first frame's token so its literal run overruns the payload.
    archive[8] = 0xFF;
    match decoder::decode_all(&archive, opts) {
        Err(ArchiveError::CorruptedArchive { frame: 0, kind }) => assert!(matches!(
            kind,
            Corruption::UndecodableBlock { .. } | Corruption::WrongChunkSize { .. }
        )),
        other => panic!("expected corruption in frame 0, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// File helpers and in-place runs
// ---------------------------------------------------------------------------

#[test]
fn in_place_compress_then_decompress() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.bin");
    let data = repetitive_data(b"in place round trip ", 200_000);
    std::fs::write(&path, &data).unwrap();
    let opts = ArchiveOptions::with_chunk_size(32_768);

    let enc = encode_file(&path, &path, opts).unwrap();
    assert_eq!(enc.input_size, data.len() as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), enc.archive_size);
    assert_eq!(entries(dir.path()), ["data.bin"]);

    decode_file(&path, &path, opts).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(entries(dir.path()), ["data.bin"]);
}

#[test]
fn in_place_output_matches_separate_output() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let c = dir.path().join("c.lz4");
    let d = dir.path().join("d.bin");
    let mut data = repetitive_data(b"same bytes either way ", 60_000);
    data.extend(generate_data(20_000, 21));
    std::fs::write(&a, &data).unwrap();
    std::fs::write(&b, &data).unwrap();
    let opts = ArchiveOptions::with_chunk_size(16_384);

    encode_file(&a, &a, opts).unwrap();
    encode_file(&b, &c, opts).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&c).unwrap());

    decode_file(&a, &a, opts).unwrap();
    decode_file(&c, &d, opts).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), data);
    assert_eq!(std::fs::read(&d).unwrap(), data);
    assert_eq!(entries(dir.path()), ["a.bin", "b.bin", "c.lz4", "d.bin"]);
}

#[test]
fn read_error_mid_stream_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("src.bin");
    let output = dir.path().join("src.bin.lz4");
    let data = generate_data(10_000, 5);
    std::fs::write(&input, &data).unwrap();
    // Three full frames are written before the read fails.
    let opts = ArchiveOptions::with_chunk_size(1000);

    let reader = BrokenReader::new(&data, 3500);
    let err = encode_through_safe_output(&input, &output, reader, opts).unwrap_err();
    assert!(matches!(err, ArchiveError::Io(_)), "unexpected error {err}");
    assert_eq!(err.exit_code(), 1);
    assert!(!output.exists());
    assert_eq!(entries(dir.path()), ["src.bin"]);
}

#[test]
fn read_error_mid_stream_in_place_keeps_input() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("src.bin");
    let data = generate_data(10_000, 6);
    std::fs::write(&path, &data).unwrap();
    let opts = ArchiveOptions::with_chunk_size(1000);

    let reader = BrokenReader::new(&data, 3500);
    let err = encode_through_safe_output(&path, &path, reader, opts).unwrap_err();
    assert!(matches!(err, ArchiveError::Io(_)), "unexpected error {err}");
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(entries(dir.path()), ["src.bin"]);
}

#[test]
fn in_place_through_roundabout_path() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let path = dir.path().join("data.bin");
    let roundabout = dir.path().join("sub").join("..").join("data.bin");
    let data = repetitive_data(b"xyz", 10_000);
    std::fs::write(&path, &data).unwrap();

    let opts = ArchiveOptions::with_chunk_size(4096);
    encode_file(&path, &roundabout, opts).unwrap();
    assert_eq!(decoder::decode_all(&std::fs::read(&path).unwrap(), opts).unwrap(), data);
    assert_eq!(entries(dir.path()), ["data.bin", "sub"]);
}

#[test]
fn codec_failure_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.lz4");
    std::fs::write(&input, generate_data(10_000, 5)).unwrap();
    let opts = ArchiveOptions::with_chunk_size(1000);

    let err = encode_file_with_codec(&input, &output, FailingCodec::new(4), opts).unwrap_err();
    assert!(matches!(err, ArchiveError::Codec { codec: "failing", .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(entries(dir.path()), ["in.bin"]);
}

#[test]
fn codec_failure_in_place_keeps_input() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keep.bin");
    let data = generate_data(10_000, 9);
    std::fs::write(&path, &data).unwrap();
    let opts = ArchiveOptions::with_chunk_size(1000);

    encode_file_with_codec(&path, &path, FailingCodec::new(2), opts).unwrap_err();
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(entries(dir.path()), ["keep.bin"]);
}

#[test]
fn out_of_memory_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.lz4");
    std::fs::write(&input, b"tiny").unwrap();
    let opts = ArchiveOptions::with_chunk_size(usize::MAX);

    let err = encode_file_with_codec(&input, &output, HungryCodec, opts).unwrap_err();
    assert!(matches!(err, ArchiveError::OutOfMemory { .. }));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(entries(dir.path()), ["in.bin"]);

    let err = decode_file_with_codec(&input, &input, HungryCodec, opts).unwrap_err();
    assert!(matches!(err, ArchiveError::OutOfMemory { .. }));
    assert_eq!(std::fs::read(&input).unwrap(), b"tiny");
    assert_eq!(entries(dir.path()), ["in.bin"]);
}

#[test]
fn corrupted_archive_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let archive = dir.path().join("in.lz4");
    let output = dir.path().join("out.bin");
    std::fs::write(&input, generate_data(50_000, 1)).unwrap();
    let opts = ArchiveOptions::with_chunk_size(8192);
    encode_file(&input, &archive, opts).unwrap();

    let bytes = std::fs::read(&archive).unwrap();
    std::fs::write(&archive, &bytes[..bytes.len() / 2]).unwrap();

    let err = decode_file(&archive, &output, opts).unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(err.exit_code(), 6);
    assert!(!output.exists());
}

#[test]
fn wrong_chunk_size_on_decode_is_corruption() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let archive = dir.path().join("in.lz4");
    let output = dir.path().join("out.bin");
    std::fs::write(&input, repetitive_data(b"q", 20_000)).unwrap();
    encode_file(&input, &archive, ArchiveOptions::with_chunk_size(4096)).unwrap();

    let err = decode_file(&archive, &output, ArchiveOptions::with_chunk_size(8192)).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::CorruptedArchive {
            kind: Corruption::WrongChunkSize { .. },
            ..
        }
    ));
    assert!(!output.exists());
}

#[test]
fn overwrites_existing_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.lz4");
    std::fs::write(&input, b"AAAAA").unwrap();
    std::fs::write(&output, vec![0u8; 1000]).unwrap();

    encode_file(&input, &output, ArchiveOptions::default()).unwrap();
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 14);
}
