pub mod chunks;
pub mod color;
mod crc;
mod error;
pub mod filters;
mod image_data;
mod png;
mod raster;

pub use color::ColorTransform;
pub use crc::calculate_crc;
pub use error::EncodeError;
pub use image_data::{compress_data, Compressor, ZlibCompressor};
pub use png::{encode_png, write_png, PngEncoder};
pub use raster::{Raster, CHANNELS};
