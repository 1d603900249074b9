#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4arc::compress::ArchiveOptions;
use lz4arc::compress::decoder;
use lz4arc::compress::encoder::ArchiveEncoder;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the chunk size, second the write granularity.
    let chunk_size = 1 + data[0] as usize * 16;
    let piece = 1 + data[1] as usize;
    let payload = &data[2..];
    let opts = ArchiveOptions::with_chunk_size(chunk_size);

    let mut archive = Vec::new();
    let mut enc = ArchiveEncoder::new(&mut archive, opts).unwrap();
    for part in payload.chunks(piece) {
        enc.write_input(part).unwrap();
    }
    let (_, summary) = enc.finish().unwrap();
    assert_eq!(summary.bytes_in as usize, payload.len());
    assert_eq!(summary.frames as usize, payload.len().div_ceil(chunk_size));

    let decoded = decoder::decode_all(&archive, opts).unwrap();
    assert_eq!(decoded, payload);
});
