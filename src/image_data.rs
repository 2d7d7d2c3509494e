use log::debug;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::{filters::filter_scanlines, EncodeError, Raster};

/// Highest level miniz accepts (its "uber" mode).
const MAX_LEVEL: u8 = 10;

/// Turns filtered scanlines into a zlib stream for the IDAT chunk.
pub trait Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EncodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibCompressor {
    pub level: u8,
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Compressor for ZlibCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
        if self.level > MAX_LEVEL {
            return Err(EncodeError::Compression(format!(
                "level {} is outside 0..={MAX_LEVEL}",
                self.level
            )));
        }
        Ok(compress_to_vec_zlib(data, self.level))
    }
}

/// Filters `raster` and compresses the result into IDAT payload bytes.
pub fn compress_data(raster: &Raster, compressor: &impl Compressor) -> Result<Vec<u8>, EncodeError> {
    let filtered = filter_scanlines(raster);
    let compressed = compressor.compress(&filtered)?;
    debug!(
        "compressed {} filtered bytes into {}",
        filtered.len(),
        compressed.len()
    );
    Ok(compressed)
}
