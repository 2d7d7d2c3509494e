use std::{io, path::PathBuf};

use crate::chunks::ChunkError;

/// Errors that abort an encode.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("raster of {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unknown color filter: {0}")]
    UnknownFilter(String),

    #[error("invalid noise strength: {0}")]
    InvalidStrength(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error("cannot read raw image {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write PNG to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
