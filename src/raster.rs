use std::{fs, path::Path};

use log::debug;

use crate::EncodeError;

/// Bytes per pixel: R, G, B.
pub const CHANNELS: usize = 3;

/// A row-major, unpadded 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    /// Wraps `data`, which must hold exactly `width * height * 3` bytes.
    ///
    /// Dimensions whose byte count doesn't fit in `usize` are reported with
    /// `expected: usize::MAX`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EncodeError> {
        let expected = byte_len(width, height);
        if expected != Some(data.len()) {
            return Err(EncodeError::InvalidDimensions {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Reads a headerless RGB file of the given dimensions.
    pub fn load(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, EncodeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| EncodeError::Read {
            path: path.to_owned(),
            source,
        })?;
        debug!("read {} bytes from {}", data.len(), path.display());
        Self::new(width, height, data)
    }

    /// Bytes per row, without the filter tag.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }
}

fn byte_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(CHANNELS)
}
