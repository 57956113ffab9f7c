//! Binary codecs for topograph.
//!
//! Loads external density-map resources and reads/writes scene snapshots.

use std::fmt;

mod density_format;
mod scene_format;

pub use density_format::{load_density_map, write_density_map, DENSITY_MAP_LEN};
pub use scene_format::{read_scene, write_scene, SCENE_MAGIC, SCENE_RECORD_LEN};

/// Error type for format parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid magic bytes
    InvalidHeader,
    /// Unexpected end of data
    UnexpectedEof,
    /// Data is longer or shorter than the fixed record size
    InvalidLength { expected: usize, found: usize },
    /// I/O error
    Io(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidHeader => write!(f, "invalid header"),
            FormatError::UnexpectedEof => write!(f, "unexpected end of data"),
            FormatError::InvalidLength { expected, found } => {
                write!(f, "expected {} bytes, found {}", expected, found)
            }
            FormatError::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        if err.is_eof() {
            return FormatError::UnexpectedEof;
        }
        match err.root_cause() {
            binrw::Error::BadMagic { .. } => FormatError::InvalidHeader,
            other => FormatError::Io(other.to_string()),
        }
    }
}
