use crate::core::decode::{AnalysisError, open_image};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Side of the reduced grid the hash is computed on.
pub const GRID_SIZE: u32 = 8;

/// A 64-bit mean hash: one bit per cell of an 8×8 grayscale reduction, set
/// when the cell is at least as bright as the grid mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub const BITS: u32 = GRID_SIZE * GRID_SIZE;

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// The hash with bit `index` inverted.
    pub fn flip(&self, index: u32) -> Self {
        debug_assert!(index < Self::BITS);
        Self(self.0 ^ (1u64 << index))
    }

    /// Every hash at Hamming distance exactly 1, one per bit.
    pub fn neighbors(&self) -> impl Iterator<Item = PerceptualHash> + '_ {
        (0..Self::BITS).map(move |i| self.flip(i))
    }

    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn is_neighbor(&self, other: &PerceptualHash) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Computes [`PerceptualHash`]es from a Lanczos reduction of the luma
/// channel. Bits run row-major from the most significant end.
pub struct PerceptualHasher {
    filter: FilterType,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    pub fn hash_gray(&self, gray: &GrayImage) -> PerceptualHash {
        let grid = imageops::resize(gray, GRID_SIZE, GRID_SIZE, self.filter);
        let cells = grid.as_raw();
        // Compared against the exact mean; a truncated integer mean would
        // set bits for cells just below it.
        let mean = cells.iter().map(|&v| f64::from(v)).sum::<f64>() / cells.len() as f64;
        let bits = cells
            .iter()
            .fold(0u64, |acc, &v| (acc << 1) | u64::from(f64::from(v) >= mean));
        PerceptualHash(bits)
    }

    pub fn hash_image(&self, img: &DynamicImage) -> PerceptualHash {
        self.hash_gray(&img.to_luma8())
    }

    pub fn hash_path(&self, path: &Path) -> Result<PerceptualHash, AnalysisError> {
        Ok(self.hash_image(&open_image(path)?))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}
