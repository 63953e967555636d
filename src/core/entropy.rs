use crate::config::ContrastConfig;
use crate::core::FilterError;
use crate::core::decode::{AnalysisError, measure_all, open_gray};
use crate::core::report::{Pass, PassReport, Reason};
use crate::session::Session;
use image::{GrayImage, imageops};
use std::path::Path;

/// Intensities 0..=254 get a bin each; 255 shares the last one.
pub const HISTOGRAM_BINS: usize = 255;

pub fn histogram(values: &[u8]) -> [u64; HISTOGRAM_BINS] {
    let mut counts = [0u64; HISTOGRAM_BINS];
    for &v in values {
        counts[(v as usize).min(HISTOGRAM_BINS - 1)] += 1;
    }
    counts
}

/// Shannon entropy (nats) of the intensity histogram of `values`.
/// Empty bins are left out; an empty slice has zero entropy.
pub fn entropy_of(values: &[u8]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total = values.len() as f64;
    let sum: f64 = histogram(values)
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            p * p.ln()
        })
        .sum();
    let entropy = -sum;
    if entropy > 0.0 { entropy } else { 0.0 }
}

pub fn entropy(gray: &GrayImage) -> f64 {
    entropy_of(gray.as_raw())
}

/// Trim `fraction` of the width and height from every edge. Bounds are
/// rounded half-to-even.
pub fn central_crop(gray: &GrayImage, fraction: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (x0, x1) = crop_bounds(width, fraction);
    let (y0, y1) = crop_bounds(height, fraction);
    imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image()
}

fn crop_bounds(len: u32, fraction: f64) -> (u32, u32) {
    let len_f = len as f64;
    let start = (len_f * fraction).round_ties_even().clamp(0.0, len_f) as u32;
    let end = (len_f * (1.0 - fraction)).round_ties_even().clamp(0.0, len_f) as u32;
    (start, end.max(start))
}

/// Entropy of the central region, the low-contrast metric.
pub fn center_entropy(gray: &GrayImage, fraction: f64) -> f64 {
    entropy(&central_crop(gray, fraction))
}

/// Moves images whose central region carries too little intensity information.
pub struct ContrastDetector {
    config: ContrastConfig,
}

impl ContrastDetector {
    pub fn new(config: ContrastConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, path: &Path) -> Result<f64, AnalysisError> {
        Ok(center_entropy(&open_gray(path)?, self.config.crop_fraction))
    }

    pub fn is_low_contrast(&self, entropy: f64) -> bool {
        entropy <= self.config.threshold
    }

    pub fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        let target = self.config.target_dir_for(dir);
        let images = session.scan(dir)?;
        let mut report = PassReport::new(Pass::Contrast, dir, &target, images.len());

        for (path, metric) in measure_all(&images, session, |p| self.measure(p))? {
            session.check_cancelled()?;
            match metric {
                Ok(entropy) => {
                    log::debug!("{} center entropy {:.4}", path.display(), entropy);
                    if self.is_low_contrast(entropy) {
                        report.flag(session, &path, Reason::LowContrast { entropy });
                    }
                }
                Err(e) => report.record_unreadable(&path, &e),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::core::testing::{flat_image, noise_image, ramp_image, save_gray};
    use approx::assert_relative_eq;
    use image::Luma;
    use tempfile::TempDir;

    #[test]
    fn test_single_value_has_zero_entropy() {
        for value in [0u8, 17, 254, 255] {
            let e = entropy(&flat_image(20, 10, value));
            assert_eq!(e, 0.0);
            assert!(e.is_sign_positive());
        }
        assert_eq!(entropy_of(&[]), 0.0);
    }

    #[test]
    fn test_uniform_histogram_reaches_ln_255() {
        let img = ramp_image(255, 4, 0);
        assert_relative_eq!(entropy(&img), 255f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_random_image_approaches_ln_255() {
        let img = noise_image(512, 512, 42, 0, 255);
        let e = entropy(&img);
        assert!(e < 255f64.ln());
        assert!(e > 255f64.ln() - 0.01, "entropy {e}");
    }

    #[test]
    fn test_top_two_intensities_share_a_bin() {
        let counts = histogram(&[254, 255, 0]);
        assert_eq!(counts[254], 2);
        assert_eq!(counts[0], 1);
        assert_eq!(entropy_of(&[254, 255]), 0.0);
        assert_relative_eq!(entropy_of(&[0, 1]), 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_central_crop_dimensions() {
        let img = ramp_image(100, 50, 1);
        let crop = central_crop(&img, 0.1);
        assert_eq!(crop.dimensions(), (80, 40));
        assert_eq!(crop.get_pixel(0, 0), img.get_pixel(10, 5));

        // 25 * 0.1 = 2.5 rounds to 2, 25 * 0.9 = 22.5 rounds to 22.
        assert_eq!(central_crop(&ramp_image(25, 25, 1), 0.1).dimensions(), (20, 20));
        assert_eq!(central_crop(&ramp_image(1, 1, 1), 0.1).dimensions(), (1, 1));
        assert_eq!(central_crop(&ramp_image(255, 3, 1), 0.0).dimensions(), (255, 3));
    }

    #[test]
    fn test_border_is_ignored() {
        let mut img = flat_image(50, 50, 128);
        for x in 0..50 {
            for y in 0..4 {
                img.put_pixel(x, y, Luma([(x * 5) as u8]));
            }
        }
        assert!(entropy(&img) > 0.0);
        assert_eq!(center_entropy(&img, 0.1), 0.0);
    }

    #[test]
    fn test_detector_moves_flat_images() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&flat_image(40, 40, 30), &temp_dir.path().join("dark.png"));
        save_gray(&ramp_image(255, 40, 3), &temp_dir.path().join("ramp.png"));

        let detector = ContrastDetector::new(ContrastConfig::default());
        let mut session = Session::new(&FilterConfig::default());
        let report = detector.run(temp_dir.path(), &mut session).unwrap();

        assert_eq!(report.scanned, 2);
        let moved: Vec<_> = report.relocated().collect();
        assert_eq!(moved, vec![temp_dir.path().join("dark.png").as_path()]);
        assert!(temp_dir.path().join("low_contrast").join("dark.png").exists());
        assert!(temp_dir.path().join("ramp.png").exists());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let detector = ContrastDetector::new(ContrastConfig {
            threshold: 2.0,
            ..ContrastConfig::default()
        });
        assert!(detector.is_low_contrast(2.0));
        assert!(!detector.is_low_contrast(2.0 + 1e-9));
    }
}
