#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4arc::compress::ArchiveOptions;
use lz4arc::compress::decoder;
use lz4arc::io;

fuzz_target!(|data: &[u8]| {
    // The decoder must never panic on arbitrary bytes, only return errors.
    // A small chunk size keeps allocations cheap and exercises many frames.
    let opts = ArchiveOptions::with_chunk_size(1024);
    let _ = decoder::decode_all(data, opts);
    let _ = io::inspect(data, opts);

    // Also behind a valid magic number, so frame parsing is reached.
    let mut archive = vec![0x02, 0x21, 0x4C, 0x18];
    archive.extend_from_slice(data);
    let _ = decoder::decode_all(&archive, opts);
});
