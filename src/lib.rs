//! lz4arc: chunked LZ4 archives in the legacy frame layout.
//!
//! An archive is a 4-byte little-endian magic number followed by one frame
//! per fixed-size chunk of input, each frame being a little-endian length
//! prefix and an LZ4 block. The crate provides:
//! - The on-disk layout (`format`)
//! - Streaming encoder/decoder pipelines (`compress`)
//! - Outputs that only appear once complete, in-place runs included (`safe_output`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use lz4arc::compress::encoder;
//! use lz4arc::compress::decoder;
//! use lz4arc::compress::ArchiveOptions;
//!
//! let data = b"hello hello hello hello";
//!
//! let mut archive = Vec::new();
//! encoder::encode_all(&mut archive, data, ArchiveOptions::default()).unwrap();
//! let decoded = decoder::decode_all(&archive, ArchiveOptions::default()).unwrap();
//! assert_eq!(decoded, data);
//! ```

pub mod compress;
pub mod error;
pub mod format;
pub mod io;
pub mod safe_output;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::ArchiveError;
