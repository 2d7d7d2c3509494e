use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    chunks::{idat::IDATChunk, iend::IENDChunk, ihdr::IHDRChunk, PngChunk, PNG_SIGNATURE},
    color::ColorTransform,
    image_data::{compress_data, Compressor, ZlibCompressor},
    EncodeError, Raster,
};

/// Assembles signature, IHDR, one IDAT holding `compressed` and IEND.
///
/// Fails with [`ChunkError::TooLarge`](crate::chunks::ChunkError::TooLarge) when
/// `compressed` is longer than [`MAX_CHUNK_LEN`](crate::chunks::MAX_CHUNK_LEN).
pub fn encode_png(width: u32, height: u32, compressed: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::with_capacity(PNG_SIGNATURE.len() + 25 + 12 + compressed.len() + 12);
    bytes.extend(PNG_SIGNATURE);
    IHDRChunk::truecolor(width, height).write_to(&mut bytes)?;
    IDATChunk { data: compressed }.write_to(&mut bytes)?;
    IENDChunk.write_to(&mut bytes)?;
    Ok(bytes)
}

/// Sibling of `path` that the PNG is staged in before being renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| "out.png".as_ref()));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Writes a complete PNG to `path`.
///
/// The bytes go to a new file next to `path` first and are renamed over it only
/// once they are synced, so a failed write leaves whatever was at `path` as it
/// was. The staging file is removed on failure.
pub fn write_png(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    compressed: &[u8],
) -> Result<(), EncodeError> {
    let path = path.as_ref();
    let bytes = encode_png(width, height, compressed)?;
    let staging = staging_path(path);
    debug!("staging {} bytes in {}", bytes.len(), staging.display());

    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging)
        .and_then(|mut file| {
            let result = file.write_all(&bytes).and_then(|()| file.sync_all());
            if result.is_err() {
                drop(file);
                remove_staging(&staging);
            }
            result
        })
        .and_then(|()| {
            fs::rename(&staging, path).map_err(|e| {
                remove_staging(&staging);
                e
            })
        });
    if let Err(source) = written {
        return Err(EncodeError::Write {
            path: path.to_owned(),
            source,
        });
    }
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn remove_staging(staging: &Path) {
    if let Err(e) = fs::remove_file(staging) {
        warn!("couldn't remove staging file {}: {e}", staging.display());
    }
}

/// The full pipeline: color transform, Paeth filtering, compression, chunk assembly.
#[derive(Debug, Clone)]
pub struct PngEncoder<C = ZlibCompressor> {
    transform: ColorTransform,
    compressor: C,
}

impl PngEncoder {
    pub fn new(transform: ColorTransform) -> Self {
        Self {
            transform,
            compressor: ZlibCompressor::default(),
        }
    }
}

impl Default for PngEncoder {
    fn default() -> Self {
        Self::new(ColorTransform::Identity)
    }
}

impl<C: Compressor> PngEncoder<C> {
    pub fn with_compressor(transform: ColorTransform, compressor: C) -> Self {
        Self {
            transform,
            compressor,
        }
    }

    /// Returns the IDAT payload for `raster` after the color transform.
    pub fn compress(&self, raster: Raster) -> Result<(u32, u32, Vec<u8>), EncodeError> {
        let raster = self.transform.apply(raster);
        debug!("encoding {}x{} raster", raster.width, raster.height);
        let compressed = compress_data(&raster, &self.compressor)?;
        Ok((raster.width, raster.height, compressed))
    }

    pub fn encode(&self, raster: Raster) -> Result<Vec<u8>, EncodeError> {
        let (width, height, compressed) = self.compress(raster)?;
        encode_png(width, height, &compressed)
    }

    pub fn encode_to_file(&self, raster: Raster, path: impl AsRef<Path>) -> Result<(), EncodeError> {
        let (width, height, compressed) = self.compress(raster)?;
        write_png(path, width, height, &compressed)
    }
}
