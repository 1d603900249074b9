// Length-prefixed frames.
//
// Each frame is a 4-byte little-endian payload length followed by exactly
// that many bytes of compressed data. There is no end marker: a clean end of
// stream where the next length prefix would start terminates the archive.

use std::io::{self, Read, Write};

use super::header::{decode_u32, encode_u32};

/// Size of a frame's length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Frame-level read failure.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("length prefix truncated: {got} of {LENGTH_PREFIX_SIZE} bytes")]
    TruncatedLength { got: usize },
    #[error("payload truncated: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: u32, got: usize },
    #[error("payload length {len} exceeds buffer capacity {capacity}")]
    Oversized { len: u32, capacity: usize },
}

// ---------------------------------------------------------------------------
// Reading helpers
// ---------------------------------------------------------------------------

/// Fill `buf` from `r`, looping over short reads.
///
/// Returns the number of bytes read, which is less than `buf.len()` only if
/// the stream ended. `Interrupted` errors are retried.
pub fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read the next frame's length prefix.
///
/// Returns `Ok(None)` when the stream is already exhausted (clean end of
/// archive). A partial prefix of 1-3 bytes is `FrameError::TruncatedLength`.
pub fn read_frame_length<R: Read + ?Sized>(r: &mut R) -> Result<Option<u32>, FrameError> {
    let mut bytes = [0u8; LENGTH_PREFIX_SIZE];
    match read_full(r, &mut bytes)? {
        0 => Ok(None),
        LENGTH_PREFIX_SIZE => Ok(Some(decode_u32(bytes))),
        got => Err(FrameError::TruncatedLength { got }),
    }
}

/// Read exactly `len` payload bytes into the front of `buf`.
pub fn read_frame_payload<R: Read + ?Sized>(
    r: &mut R,
    len: u32,
    buf: &mut [u8],
) -> Result<(), FrameError> {
    let capacity = buf.len();
    let dst = usize::try_from(len)
        .ok()
        .and_then(|n| buf.get_mut(..n))
        .ok_or(FrameError::Oversized { len, capacity })?;
    let got = read_full(r, dst)?;
    if got < dst.len() {
        return Err(FrameError::TruncatedPayload { expected: len, got });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write one frame: length prefix followed by the payload.
pub fn write_frame<W: Write + ?Sized>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame payload of {} bytes does not fit a u32", payload.len()),
        )
    })?;
    w.write_all(&encode_u32(len))?;
    w.write_all(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
