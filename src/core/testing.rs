//! Synthetic images for unit tests.

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageFormat, Luma};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Rows are shifted copies of 0..=254, so every histogram bin gets the same count.
pub(crate) fn ramp_image(width: u32, height: u32, shift: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x + shift * y) % 255) as u8]))
}

pub(crate) fn flat_image(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Deterministic pseudo-random pixels in `lo..=hi`.
pub(crate) fn noise_image(width: u32, height: u32, seed: u64, lo: u8, hi: u8) -> GrayImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let span = (hi - lo) as u64 + 1;
    GrayImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        Luma([lo + (state % span) as u8])
    })
}

/// An 8×8 grid of blocks, bright where `bright(row, col)` holds, dark elsewhere,
/// with per-pixel noise on top so the image has high-frequency detail.
pub(crate) fn block_image<F>(block: u32, seed: u64, bright: F) -> GrayImage
where
    F: Fn(u32, u32) -> bool,
{
    let noise = noise_image(block * 8, block * 8, seed, 0, 60);
    GrayImage::from_fn(block * 8, block * 8, |x, y| {
        let base: u8 = if bright(y / block, x / block) { 185 } else { 10 };
        Luma([base + noise.get_pixel(x, y)[0]])
    })
}

/// Write `img` as PNG, or as maximum-quality JPEG for `.jpg` paths.
pub(crate) fn save_gray(img: &GrayImage, path: &Path) {
    match ImageFormat::from_path(path).unwrap() {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(File::create(path).unwrap());
            let mut encoder = JpegEncoder::new_with_quality(writer, 100);
            encoder.encode_image(img).unwrap();
        }
        format => img.save_with_format(path, format).unwrap(),
    }
}
