use crate::config::OutlierConfig;
use crate::core::FilterError;
use crate::core::decode::{AnalysisError, measure_all, open_gray};
use crate::core::entropy::entropy;
use crate::core::report::{Pass, PassReport, Reason};
use crate::session::Session;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Quantile `q` (0..=1) of an ascending slice, interpolating linearly between
/// the two closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Tukey fence `[Q1 - k·IQR, Q3 + k·IQR]` over a sample. Values on the fence
/// are inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileFence {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl QuantileFence {
    /// `None` when the sample is smaller than `min_samples` or holds a
    /// non-finite value.
    pub fn from_sample(sample: &[f64], multiplier: f64, min_samples: usize) -> Option<Self> {
        if sample.len() < min_samples.max(1) || sample.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut sorted = sample.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let spread = (q3 - q1) * multiplier;
        Some(Self {
            q1,
            q3,
            lower: q1 - spread,
            upper: q3 + spread,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        !self.contains(value)
    }
}

/// Moves images whose whole-image entropy falls outside the dataset's fence.
/// Needs the full sample before classifying anything.
pub struct OutlierDetector {
    config: OutlierConfig,
}

impl OutlierDetector {
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, path: &Path) -> Result<f64, AnalysisError> {
        Ok(entropy(&open_gray(path)?))
    }

    pub fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        let target = self.config.target_dir_for(dir);
        let images = session.scan(dir)?;
        let mut report = PassReport::new(Pass::Outliers, dir, &target, images.len());

        let mut samples: Vec<(PathBuf, f64)> = Vec::with_capacity(images.len());
        for (path, metric) in measure_all(&images, session, |p| self.measure(p))? {
            match metric {
                Ok(entropy) => {
                    log::debug!("{} entropy {:.4}", path.display(), entropy);
                    samples.push((path, entropy));
                }
                Err(e) => report.record_unreadable(&path, &e),
            }
        }

        let values: Vec<f64> = samples.iter().map(|(_, e)| *e).collect();
        let Some(fence) =
            QuantileFence::from_sample(&values, self.config.iqr_multiplier, self.config.min_samples)
        else {
            let note = format!(
                "{} readable images; at least {} are needed for quartiles, skipping",
                values.len(),
                self.config.min_samples
            );
            log::info!("{}: {}", dir.display(), note);
            report.note = Some(note);
            return Ok(report);
        };
        log::debug!(
            "Entropy fence for {}: [{:.4}, {:.4}] (Q1 {:.4}, Q3 {:.4})",
            dir.display(),
            fence.lower,
            fence.upper,
            fence.q1,
            fence.q3
        );

        for (path, entropy) in samples {
            session.check_cancelled()?;
            if fence.is_outlier(entropy) {
                report.flag(session, &path, Reason::Outlier { entropy });
            }
        }

        Ok(report)
    }
}
