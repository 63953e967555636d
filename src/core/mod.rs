// Image-quality and duplicate filtering:
// - Perceptual-hash deduplication with Hamming-neighbor expansion
// - FFT sharpness scoring for blur
// - Histogram entropy for low contrast and dataset outliers

pub mod blur;
pub mod decode;
pub mod duplicate;
pub mod entropy;
pub mod inspect;
pub mod outlier;
pub mod phash;
pub mod pipeline;
pub mod relocate;
pub mod report;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Errors that abort a pass. Per-image problems are recorded in the pass
/// report instead.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Scan error: {0}")]
    Scan(#[from] scanner::ScanError),

    #[error("Operation cancelled")]
    Cancelled,
}
