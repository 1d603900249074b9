// Error taxonomy shared by the encoder, the decoder and the file helpers.

use std::io;
use std::path::PathBuf;

use crate::format::{FrameError, Magic};

/// Why a frame was rejected while decoding.
#[derive(Debug, thiserror::Error)]
pub enum Corruption {
    #[error("length prefix truncated after {got} bytes")]
    TruncatedLength { got: usize },
    #[error("payload truncated: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: u32, got: usize },
    #[error("frame length {len} exceeds bound {bound}")]
    OversizedFrame { len: u32, bound: usize },
    #[error("block does not decompress: {msg}")]
    UndecodableBlock { msg: String },
    #[error("block decompressed to {got} bytes, expected {expected}")]
    WrongChunkSize { expected: usize, got: usize },
}

/// Error returned by every archive operation.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("cannot open input {}: {source}", path.display())]
    OpenInput { path: PathBuf, source: io::Error },
    #[error("cannot open output {}: {source}", path.display())]
    OpenOutput { path: PathBuf, source: io::Error },
    #[error("not enough memory for a {requested}-byte buffer")]
    OutOfMemory { requested: usize },
    #[error("invalid archive: {0}")]
    InvalidArchive(Magic),
    #[error("corrupted archive at frame {frame}: {kind}")]
    CorruptedArchive { frame: u64, kind: Corruption },
    #[error("codec {codec} failed: {msg}")]
    Codec { codec: &'static str, msg: String },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Attach a frame index to a frame-level read failure.
    ///
    /// Short reads and oversized lengths are corruption; underlying I/O
    /// failures stay I/O errors.
    pub(crate) fn from_frame(frame: u64, err: FrameError) -> Self {
        let kind = match err {
            FrameError::Io(e) => return Self::Io(e),
            FrameError::TruncatedLength { got } => Corruption::TruncatedLength { got },
            FrameError::TruncatedPayload { expected, got } => {
                Corruption::TruncatedPayload { expected, got }
            }
            FrameError::Oversized { len, capacity } => Corruption::OversizedFrame {
                len,
                bound: capacity,
            },
        };
        Self::CorruptedArchive { frame, kind }
    }

    /// Process exit status for this failure kind.
    ///
    /// 1 = generic I/O or usage, 2 = open input, 3 = open output,
    /// 4 = out of memory, 5 = invalid archive, 6 = corrupted archive.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) | Self::Codec { .. } | Self::InvalidOptions(_) => 1,
            Self::OpenInput { .. } => 2,
            Self::OpenOutput { .. } => 3,
            Self::OutOfMemory { .. } => 4,
            Self::InvalidArchive(_) => 5,
            Self::CorruptedArchive { .. } => 6,
        }
    }

    /// Whether the archive contents (rather than the environment) are at fault.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidArchive(_) | Self::CorruptedArchive { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_corruption() {
        let err = ArchiveError::from_frame(3, FrameError::TruncatedLength { got: 2 });
        assert!(matches!(
            err,
            ArchiveError::CorruptedArchive {
                frame: 3,
                kind: Corruption::TruncatedLength { got: 2 }
            }
        ));
        assert_eq!(err.exit_code(), 6);
        assert!(err.is_corruption());
    }

    #[test]
    fn frame_io_stays_io() {
        let err = ArchiveError::from_frame(
            0,
            FrameError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        );
        assert!(matches!(err, ArchiveError::Io(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            ArchiveError::OpenInput {
                path: "in".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }
            .exit_code(),
            ArchiveError::OpenOutput {
                path: "out".into(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }
            .exit_code(),
            ArchiveError::OutOfMemory { requested: 1 }.exit_code(),
            ArchiveError::InvalidArchive(Magic::Mismatch(0)).exit_code(),
            ArchiveError::CorruptedArchive {
                frame: 0,
                kind: Corruption::OversizedFrame { len: 9, bound: 8 },
            }
            .exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4, 5, 6]);
    }

    #[test]
    fn messages_name_the_path() {
        let err = ArchiveError::OpenInput {
            path: "missing.bin".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("missing.bin"));
    }
}
