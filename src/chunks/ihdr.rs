use nom::{
    number::complete::{be_u32, u8},
    sequence::tuple,
    IResult,
};

use super::PngChunk;

/// Only 8-bit truecolor is written.
pub const BIT_DEPTH: u8 = 8;
pub const COLOR_TYPE_TRUECOLOR: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IHDRChunk {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}
impl IHDRChunk {
    pub fn truecolor(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bit_depth: BIT_DEPTH,
            color_type: COLOR_TYPE_TRUECOLOR,
            compression_method: 0,
            filter_method: 0,
            interlace_method: 0,
        }
    }
}
impl<'a> PngChunk<'a> for IHDRChunk {
    type Payload = [u8; 13];
    const HEADER: &'static [u8; 4] = b"IHDR";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (
            rest,
            (
                width,
                height,
                bit_depth,
                color_type,
                compression_method,
                filter_method,
                interlace_method,
            ),
        ) = tuple((be_u32, be_u32, u8, u8, u8, u8, u8))(chunk_data)?;
        Ok((
            rest,
            IHDRChunk {
                width,
                height,
                bit_depth,
                color_type,
                compression_method,
                filter_method,
                interlace_method,
            },
        ))
    }

    fn payload(&self) -> Self::Payload {
        let mut bytes = [0; 13];
        bytes[0..4].copy_from_slice(&self.width.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.height.to_be_bytes());
        bytes[8..].copy_from_slice(&[
            self.bit_depth,
            self.color_type,
            self.compression_method,
            self.filter_method,
            self.interlace_method,
        ]);
        bytes
    }
}
