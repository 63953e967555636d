use crate::core::FilterError;
use crate::core::scanner::ImageSet;
use crate::session::Session;
use image::{DynamicImage, GrayImage, ImageReader};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use thiserror::Error;

/// Why a single image could not be measured.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub fn open_image(path: &Path) -> Result<DynamicImage, AnalysisError> {
    let open_err = |source| AnalysisError::Open {
        path: path.display().to_string(),
        source,
    };
    ImageReader::open(path)
        .map_err(open_err)?
        .with_guessed_format()
        .map_err(open_err)?
        .decode()
        .map_err(|source| AnalysisError::Decode {
            path: path.display().to_string(),
            source,
        })
}

pub fn open_gray(path: &Path) -> Result<GrayImage, AnalysisError> {
    Ok(open_image(path)?.to_luma8())
}

/// A per-image measurement, paired with its path in scan order.
pub type Measured<T> = Vec<(PathBuf, Result<T, AnalysisError>)>;

/// Measure every image in parallel. Results come back in scan order so the
/// caller can classify and relocate sequentially.
pub(crate) fn measure_all<T, F>(
    images: &ImageSet,
    session: &Session,
    measure: F,
) -> Result<Measured<T>, FilterError>
where
    T: Send,
    F: Fn(&Path) -> Result<T, AnalysisError> + Sync,
{
    if images.is_empty() {
        log::debug!("No images to measure in {}", images.root().display());
        return Ok(Vec::new());
    }
    let token = session.get_cancellation_token();
    images
        .paths()
        .par_iter()
        .map(|path| {
            if token.load(Ordering::Relaxed) {
                return Err(FilterError::Cancelled);
            }
            Ok((path.clone(), measure(path)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::core::testing::{ramp_image, save_gray};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_gray_reads_pixels() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ramp.png");
        save_gray(&ramp_image(255, 2, 1), &path);

        let gray = open_gray(&path).unwrap();
        assert_eq!(gray.dimensions(), (255, 2));
        assert_eq!(gray.get_pixel(10, 0)[0], 10);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(open_gray(&path), Err(AnalysisError::Decode { .. })));
        assert!(matches!(
            open_gray(&temp_dir.path().join("missing.png")),
            Err(AnalysisError::Open { .. })
        ));
    }

    #[test]
    fn test_measure_all_preserves_order_and_errors() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&ramp_image(255, 1, 1), &temp_dir.path().join("a.png"));
        fs::write(temp_dir.path().join("b.png"), b"junk").unwrap();
        save_gray(&ramp_image(255, 3, 1), &temp_dir.path().join("c.png"));

        let session = Session::new(&FilterConfig::default());
        let images = session.scan(temp_dir.path()).unwrap();
        let measured = measure_all(&images, &session, |p| Ok(open_gray(p)?.height())).unwrap();

        assert_eq!(measured.len(), 3);
        assert!(measured[0].0.ends_with("a.png"));
        assert_eq!(*measured[0].1.as_ref().unwrap(), 1);
        assert!(measured[1].1.is_err());
        assert_eq!(*measured[2].1.as_ref().unwrap(), 3);
    }

    #[test]
    fn test_measure_all_on_empty_set_never_measures() {
        let temp_dir = TempDir::new().unwrap();
        let session = Session::new(&FilterConfig::default());
        let images = session.scan(temp_dir.path()).unwrap();

        let measured = measure_all(&images, &session, |_| -> Result<u32, AnalysisError> {
            panic!("nothing to measure")
        })
        .unwrap();
        assert!(measured.is_empty());
    }

    #[test]
    fn test_measure_all_honours_cancellation() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&ramp_image(255, 1, 1), &temp_dir.path().join("a.png"));

        let session = Session::new(&FilterConfig::default());
        session.cancel();
        let images = session.scan(temp_dir.path()).unwrap();
        let result = measure_all(&images, &session, |p| Ok(open_gray(p)?.height()));

        assert!(matches!(result, Err(FilterError::Cancelled)));
    }
}
