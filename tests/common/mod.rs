use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// An 8×8 grid of blocks, bright where `bright(row, col)` holds, with
/// deterministic per-pixel noise for high-frequency detail.
pub fn block_image<F>(block: u32, seed: u64, bright: F) -> GrayImage
where
    F: Fn(u32, u32) -> bool,
{
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    GrayImage::from_fn(block * 8, block * 8, |x, y| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let base: u8 = if bright(y / block, x / block) { 185 } else { 10 };
        Luma([base + (state % 61) as u8])
    })
}

pub fn save_jpeg(img: &GrayImage, path: &Path) {
    let writer = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new_with_quality(writer, 100)
        .encode_image(img)
        .unwrap();
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
