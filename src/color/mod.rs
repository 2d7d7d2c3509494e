use std::{fmt, str::FromStr};

use log::debug;

use crate::{raster::CHANNELS, EncodeError, Raster};

mod noise;

pub use noise::{apply_noise, Perlin, NOISE_SEED};

/// A per-pixel color transform applied before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorTransform {
    #[default]
    Identity,
    Invert,
    Grayscale,
    /// Perlin noise overlay; `strength` is a percentage in `[0, 100]`.
    ProceduralNoise { strength: f32 },
}

impl ColorTransform {
    pub const NAMES: [&'static str; 4] = ["none", "negative", "grayscale", "perlin"];

    /// Parses `name` and attaches `strength` when it names the noise transform.
    ///
    /// The strength is ignored for every other transform.
    pub fn with_strength(name: &str, strength: Option<f32>) -> Result<Self, EncodeError> {
        Ok(match name.parse::<ColorTransform>()? {
            ColorTransform::ProceduralNoise { .. } => ColorTransform::ProceduralNoise {
                strength: strength.unwrap_or(0.0),
            },
            other => other,
        })
    }

    pub fn apply(self, raster: Raster) -> Raster {
        debug!("applying {self} color transform");
        let Raster {
            width,
            height,
            data,
        } = raster;
        let data = match self {
            ColorTransform::Identity => data,
            ColorTransform::Invert => invert(data),
            ColorTransform::Grayscale => grayscale(data),
            ColorTransform::ProceduralNoise { strength } => {
                apply_noise(data, width, height, strength)
            }
        };
        Raster {
            width,
            height,
            data,
        }
    }
}

impl FromStr for ColorTransform {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::Identity),
            "negative" => Ok(Self::Invert),
            "grayscale" => Ok(Self::Grayscale),
            "perlin" => Ok(Self::ProceduralNoise { strength: 0.0 }),
            _ => Err(EncodeError::UnknownFilter(s.to_owned())),
        }
    }
}

impl fmt::Display for ColorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => Self::NAMES[0],
            Self::Invert => Self::NAMES[1],
            Self::Grayscale => Self::NAMES[2],
            Self::ProceduralNoise { .. } => Self::NAMES[3],
        };
        f.write_str(name)
    }
}

pub fn invert(mut data: Vec<u8>) -> Vec<u8> {
    for value in data.iter_mut() {
        *value = u8::MAX - *value;
    }
    data
}

const RED_WEIGHT: f32 = 0.299;
const GREEN_WEIGHT: f32 = 0.587;
const BLUE_WEIGHT: f32 = 0.114;

/// Replaces every pixel with its rounded luma (BT.601 weights) on all channels.
pub fn grayscale(mut data: Vec<u8>) -> Vec<u8> {
    for pixel in data.chunks_exact_mut(CHANNELS) {
        let luma = RED_WEIGHT * pixel[0] as f32
            + GREEN_WEIGHT * pixel[1] as f32
            + BLUE_WEIGHT * pixel[2] as f32;
        let gray = luma.round().clamp(0.0, 255.0) as u8;
        pixel.fill(gray);
    }
    data
}
