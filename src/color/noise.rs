use log::debug;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::raster::CHANNELS;

pub const NOISE_SEED: u64 = 0x00C0_FFEE;

const BASE_FREQUENCY: f32 = 0.02;
const MAX_EXTRA_FREQUENCY: f32 = 0.38;
const MAX_AMPLITUDE: f32 = 128.0;

/// Classic 2-D gradient noise over a seeded 256-entry permutation.
#[derive(Debug, Clone)]
pub struct Perlin {
    permutation: [u8; 512],
}

impl Perlin {
    pub fn new(seed: u64) -> Self {
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        table.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        let mut permutation = [0; 512];
        permutation[..256].copy_from_slice(&table);
        permutation[256..].copy_from_slice(&table);
        Self { permutation }
    }

    fn hash(&self, i: usize) -> usize {
        self.permutation[i] as usize
    }

    /// Samples the noise field; values lie roughly in `[-1, 1]` and are 0 on lattice points.
    pub fn noise(&self, x: f32, y: f32) -> f32 {
        let (x_floor, y_floor) = (x.floor(), y.floor());
        let xi = (x_floor as i64 & 255) as usize;
        let yi = (y_floor as i64 & 255) as usize;
        let xf = x - x_floor;
        let yf = y - y_floor;

        let aa = self.hash(self.hash(xi) + yi);
        let ab = self.hash(self.hash(xi) + yi + 1);
        let ba = self.hash(self.hash(xi + 1) + yi);
        let bb = self.hash(self.hash(xi + 1) + yi + 1);

        let u = fade(xf);
        let v = fade(yf);

        let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
        lerp(x1, x2, v)
    }
}

fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

fn grad(hash: usize, x: f32, y: f32) -> f32 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

/// Adds Perlin noise to every channel. `strength` is a percentage; NaN or a
/// value at or below zero leaves `data` untouched, and values above 100 are
/// capped.
pub fn apply_noise(mut data: Vec<u8>, width: u32, height: u32, strength: f32) -> Vec<u8> {
    let stride = (width as usize).saturating_mul(CHANNELS);
    if strength.is_nan() || strength <= 0.0 || stride == 0 || data.is_empty() {
        return data;
    }
    let strength = strength.min(100.0) / 100.0;
    let frequency = BASE_FREQUENCY + MAX_EXTRA_FREQUENCY * strength;
    let amplitude = MAX_AMPLITUDE * strength;
    debug!("noise overlay: frequency {frequency}, amplitude {amplitude}");

    let perlin = Perlin::new(NOISE_SEED);
    for (y, row) in data.chunks_exact_mut(stride).take(height as usize).enumerate() {
        for (x, pixel) in row.chunks_exact_mut(CHANNELS).enumerate() {
            let n = perlin.noise(x as f32 * frequency, y as f32 * frequency);
            let delta = (n * amplitude) as i32;
            for channel in pixel.iter_mut() {
                *channel = (*channel as i32 + delta).clamp(0, 255) as u8;
            }
        }
    }
    data
}
