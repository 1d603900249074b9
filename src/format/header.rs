// Archive header: magic number and 32-bit field byte order.
//
// The archive always stores 4-byte fields little-endian. The conversion is
// a no-op on little-endian hosts and a byte swap on big-endian ones.

use std::fmt;
use std::io::{self, Read, Write};

use super::frame::read_full;

// ---------------------------------------------------------------------------
// Magic number
// ---------------------------------------------------------------------------

/// Magic number identifying an archive, stored little-endian at offset 0.
pub const ARCHIVE_MAGIC: u32 = 0x184C_2102;

/// Size of the magic number in bytes.
pub const MAGIC_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Endianness normalization
// ---------------------------------------------------------------------------

/// Convert a host-order value to its little-endian representation.
#[inline]
pub const fn to_little_endian(value: u32) -> u32 {
    value.to_le()
}

/// Convert a little-endian representation back to host order.
#[inline]
pub const fn from_little_endian(value: u32) -> u32 {
    u32::from_le(value)
}

/// Serialize a 32-bit field in archive byte order.
#[inline]
pub(crate) fn encode_u32(value: u32) -> [u8; 4] {
    to_little_endian(value).to_ne_bytes()
}

/// Deserialize a 32-bit field stored in archive byte order.
#[inline]
pub(crate) fn decode_u32(bytes: [u8; 4]) -> u32 {
    from_little_endian(u32::from_ne_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Magic check result
// ---------------------------------------------------------------------------

/// Outcome of reading the archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// The header matches [`ARCHIVE_MAGIC`].
    Valid,
    /// Four bytes were read but hold a different value.
    Mismatch(u32),
    /// The stream ended after this many bytes (fewer than 4).
    Truncated(usize),
}

impl Magic {
    /// Whether the header identifies an archive of this format.
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "magic {ARCHIVE_MAGIC:#010X}"),
            Self::Mismatch(found) => write!(
                f,
                "bad magic number: expected {ARCHIVE_MAGIC:#010X}, got {found:#010X}"
            ),
            Self::Truncated(got) => {
                write!(f, "header truncated: {got} of {MAGIC_SIZE} magic bytes")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

/// Write the archive magic number.
pub fn write_magic<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(&encode_u32(ARCHIVE_MAGIC))
}

/// Read the first 4 bytes of an archive and compare them to the magic number.
///
/// Only I/O failures are errors; a wrong or short header is reported through
/// the returned [`Magic`].
pub fn read_magic<R: Read>(r: &mut R) -> io::Result<Magic> {
    let mut bytes = [0u8; MAGIC_SIZE];
    let n = read_full(r, &mut bytes)?;
    if n < MAGIC_SIZE {
        return Ok(Magic::Truncated(n));
    }
    let value = decode_u32(bytes);
    if value == ARCHIVE_MAGIC {
        Ok(Magic::Valid)
    } else {
        Ok(Magic::Mismatch(value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le_bytes_by_shift(v: u32) -> [u8; 4] {
        [v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8]
    }

    #[test]
    fn magic_is_written_little_endian() {
        let mut out = Vec::new();
        write_magic(&mut out).unwrap();
        assert_eq!(out, [0x02, 0x21, 0x4C, 0x18]);
    }

    #[test]
    fn magic_roundtrip() {
        let mut out = Vec::new();
        write_magic(&mut out).unwrap();
        let magic = read_magic(&mut Cursor::new(out)).unwrap();
        assert_eq!(magic, Magic::Valid);
        assert!(magic.is_valid());
    }

    #[test]
    fn magic_mismatch_reports_value() {
        let magic = read_magic(&mut Cursor::new([0xD6, 0xC3, 0xC4, 0x00])).unwrap();
        assert_eq!(magic, Magic::Mismatch(0x00C4_C3D6));
        assert!(!magic.is_valid());
    }

    #[test]
    fn big_endian_magic_is_rejected() {
        let magic = read_magic(&mut Cursor::new(ARCHIVE_MAGIC.to_be_bytes())).unwrap();
        assert_eq!(magic, Magic::Mismatch(ARCHIVE_MAGIC.swap_bytes()));
    }

    #[test]
    fn short_header_is_truncated() {
        assert_eq!(read_magic(&mut Cursor::new([])).unwrap(), Magic::Truncated(0));
        assert_eq!(
            read_magic(&mut Cursor::new([0x02, 0x21, 0x4C])).unwrap(),
            Magic::Truncated(3)
        );
    }

    #[test]
    fn field_encoding_is_host_independent() {
        for v in [0u32, 1, 0xFF, 0x0102_0304, ARCHIVE_MAGIC, u32::MAX] {
            assert_eq!(encode_u32(v), le_bytes_by_shift(v));
            assert_eq!(decode_u32(le_bytes_by_shift(v)), v);
        }
    }

    #[test]
    fn endian_conversion_inverts() {
        for v in [0u32, 0x1234_5678, ARCHIVE_MAGIC, u32::MAX - 1] {
            assert_eq!(from_little_endian(to_little_endian(v)), v);
            // A byte-swapped word must come back swapped, on either host order.
            assert_eq!(
                from_little_endian(to_little_endian(v.swap_bytes())).swap_bytes(),
                v
            );
        }
    }
}
