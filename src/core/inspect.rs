use crate::config::FilterConfig;
use crate::core::FilterError;
use crate::core::blur::sharpness;
use crate::core::decode::{AnalysisError, measure_all, open_image};
use crate::core::entropy::{center_entropy, entropy};
use crate::core::phash::{PerceptualHash, PerceptualHasher};
use crate::core::report::Problem;
use crate::session::Session;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Every metric the filters use, for one image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageMetrics {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub hash: PerceptualHash,
    pub sharpness: f64,
    pub entropy: f64,
    pub center_entropy: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Inspection {
    pub images: Vec<ImageMetrics>,
    pub unreadable: Vec<Problem>,
}

pub fn measure(
    path: &Path,
    config: &FilterConfig,
    hasher: &PerceptualHasher,
) -> Result<ImageMetrics, AnalysisError> {
    let img = open_image(path)?;
    let hash = hasher.hash_image(&img);
    let gray = img.to_luma8();
    Ok(ImageMetrics {
        path: path.to_path_buf(),
        width: gray.width(),
        height: gray.height(),
        hash,
        sharpness: sharpness(&gray, config.blur.window),
        entropy: entropy(&gray),
        center_entropy: center_entropy(&gray, config.contrast.crop_fraction),
    })
}

/// Measure every image in `dir` without moving anything.
pub fn inspect(dir: &Path, config: &FilterConfig, session: &Session) -> Result<Inspection, FilterError> {
    let images = session.scan(dir)?;
    let hasher = PerceptualHasher::new();
    let mut inspection = Inspection::default();

    for (path, metrics) in measure_all(&images, session, |p| measure(p, config, &hasher))? {
        match metrics {
            Ok(metrics) => inspection.images.push(metrics),
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                inspection.unreadable.push(Problem {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(inspection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{flat_image, ramp_image, save_gray};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_reports_metrics_in_order() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&ramp_image(255, 20, 1), &temp_dir.path().join("b.png"));
        save_gray(&flat_image(30, 20, 7), &temp_dir.path().join("a.png"));
        fs::write(temp_dir.path().join("c.jpg"), b"junk").unwrap();

        let config = FilterConfig::default();
        let session = Session::new(&config);
        let inspection = inspect(temp_dir.path(), &config, &session).unwrap();

        assert_eq!(inspection.images.len(), 2);
        assert_eq!(inspection.unreadable.len(), 1);

        let flat = &inspection.images[0];
        assert!(flat.path.ends_with("a.png"));
        assert_eq!((flat.width, flat.height), (30, 20));
        assert_eq!(flat.entropy, 0.0);
        assert_eq!(flat.center_entropy, 0.0);

        let ramp = &inspection.images[1];
        assert!(ramp.entropy > flat.entropy);
        // Nothing was moved.
        assert!(temp_dir.path().join("a.png").exists());
        assert!(temp_dir.path().join("b.png").exists());
    }
}
