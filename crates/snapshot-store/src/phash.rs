//! Perceptual hash of a screenshot
//!
//! Classic DCT hash: grayscale, downscale to 32x32, 2D DCT-II, keep the 8x8
//! low-frequency block and set one bit per coefficient above the block
//! median. Visually similar screenshots land within a few bits of each other.

use std::f64::consts::PI;

use image::imageops::FilterType;

use crate::errors::CaptureError;

const SAMPLE: usize = 32;
const BLOCK: usize = 8;

pub fn phash_bytes(bytes: &[u8]) -> Result<String, CaptureError> {
    let img = image::load_from_memory(bytes).map_err(|err| CaptureError::Image(err.to_string()))?;
    Ok(phash_image(&img))
}

pub fn phash_image(img: &image::DynamicImage) -> String {
    let gray = img
        .resize_exact(SAMPLE as u32, SAMPLE as u32, FilterType::Triangle)
        .to_luma8();

    let mut pixels = [[0f64; SAMPLE]; SAMPLE];
    for (x, y, pixel) in gray.enumerate_pixels() {
        pixels[y as usize][x as usize] = f64::from(pixel.0[0]);
    }

    let coefficients = dct_low_block(&pixels);
    let mut sorted = coefficients;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = (sorted[BLOCK * BLOCK / 2 - 1] + sorted[BLOCK * BLOCK / 2]) / 2.0;

    let bits = coefficients
        .iter()
        .fold(0u64, |acc, value| (acc << 1) | u64::from(*value > median));
    format!("{bits:016x}")
}

/// Number of differing bits between two hex hashes; `None` if either is malformed
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
}

fn dct_low_block(pixels: &[[f64; SAMPLE]; SAMPLE]) -> [f64; BLOCK * BLOCK] {
    let n = SAMPLE as f64;
    let mut cosines = [[0f64; SAMPLE]; BLOCK];
    for (u, row) in cosines.iter_mut().enumerate() {
        for (x, value) in row.iter_mut().enumerate() {
            *value = ((2.0 * x as f64 + 1.0) * u as f64 * PI / (2.0 * n)).cos();
        }
    }

    let mut out = [0f64; BLOCK * BLOCK];
    for u in 0..BLOCK {
        for v in 0..BLOCK {
            let mut sum = 0.0;
            for (y, row) in pixels.iter().enumerate() {
                for (x, pixel) in row.iter().enumerate() {
                    sum += pixel * cosines[u][y] * cosines[v][x];
                }
            }
            let cu = if u == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            let cv = if v == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            out[u * BLOCK + v] = cu * cv * sum;
        }
    }
    out
}
