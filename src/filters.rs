use crate::raster::{Raster, CHANNELS};

/// Filter type tag written at the start of every scanline.
pub const PAETH: u8 = 4;

pub(crate) fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let (a_i, b_i, c_i) = (a as i16, b as i16, c as i16);
    let p = a_i + b_i - c_i;
    let pa = (p - a_i).abs();
    let pb = (p - b_i).abs();
    let pc = (p - c_i).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Paeth-filters every row of `raster`, each prefixed with its filter tag.
///
/// Output is `(width * 3 + 1) * height` bytes.
pub fn filter_scanlines(raster: &Raster) -> Vec<u8> {
    let stride = raster.stride();
    let mut filtered = Vec::with_capacity((stride + 1) * raster.height as usize);
    if stride == 0 {
        filtered.resize(raster.height as usize, PAETH);
        return filtered;
    }

    let mut previous: Option<&[u8]> = None;
    for row in raster.data.chunks_exact(stride) {
        filtered.push(PAETH);
        for (i, &x) in row.iter().enumerate() {
            let a = if i >= CHANNELS { row[i - CHANNELS] } else { 0 };
            let (b, c) = match previous {
                Some(up) => (up[i], if i >= CHANNELS { up[i - CHANNELS] } else { 0 }),
                None => (0, 0),
            };
            filtered.push(x.wrapping_sub(paeth_predictor(a, b, c)));
        }
        previous = Some(row);
    }
    filtered
}
