use crate::config::FilterConfig;
use crate::core::FilterError;
use crate::core::blur::BlurDetector;
use crate::core::duplicate::Deduplicator;
use crate::core::entropy::ContrastDetector;
use crate::core::outlier::OutlierDetector;
use crate::core::report::{Pass, PassReport};
use crate::session::Session;
use std::path::Path;

/// A pass over one directory that relocates the images it flags.
pub trait Filter {
    fn pass(&self) -> Pass;
    fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError>;
}

impl Filter for ContrastDetector {
    fn pass(&self) -> Pass {
        Pass::Contrast
    }

    fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        ContrastDetector::run(self, dir, session)
    }
}

impl Filter for Deduplicator {
    fn pass(&self) -> Pass {
        Pass::Dedup
    }

    fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        Deduplicator::run(self, dir, session)
    }
}

impl Filter for BlurDetector {
    fn pass(&self) -> Pass {
        Pass::Blur
    }

    fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        BlurDetector::run(self, dir, session)
    }
}

impl Filter for OutlierDetector {
    fn pass(&self) -> Pass {
        Pass::Outliers
    }

    fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        OutlierDetector::run(self, dir, session)
    }
}

pub fn build_filter(pass: Pass, config: &FilterConfig) -> Box<dyn Filter> {
    match pass {
        Pass::Contrast => Box::new(ContrastDetector::new(config.contrast.clone())),
        Pass::Dedup => Box::new(Deduplicator::new(config.dedup.clone())),
        Pass::Blur => Box::new(BlurDetector::new(config.blur.clone())),
        Pass::Outliers => Box::new(OutlierDetector::new(config.outliers.clone())),
    }
}

/// Runs the selected passes one after another over the same directory, so
/// each pass sees what the previous ones left behind. The order is fixed:
/// contrast, dedup, blur, outliers.
pub struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl Pipeline {
    /// The reference composition: low contrast first, then duplicates.
    pub const DEFAULT_PASSES: [Pass; 2] = [Pass::Contrast, Pass::Dedup];

    pub fn from_config(config: &FilterConfig, passes: &[Pass]) -> Self {
        let mut passes = passes.to_vec();
        passes.sort();
        passes.dedup();
        Self {
            filters: passes.into_iter().map(|p| build_filter(p, config)).collect(),
        }
    }

    pub fn passes(&self) -> Vec<Pass> {
        self.filters.iter().map(|f| f.pass()).collect()
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn run(&self, dir: &Path, session: &mut Session) -> Result<Vec<PassReport>, FilterError> {
        let mut reports = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            session.check_cancelled()?;
            log::debug!("Running {} pass over {}", filter.pass(), dir.display());
            reports.push(filter.run(dir, session)?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{block_image, flat_image, save_gray};
    use tempfile::TempDir;

    #[test]
    fn test_passes_run_in_fixed_order() {
        let config = FilterConfig::default();
        let pipeline = Pipeline::from_config(
            &config,
            &[Pass::Outliers, Pass::Dedup, Pass::Blur, Pass::Contrast, Pass::Dedup],
        );
        assert_eq!(pipeline.passes(), Pass::ALL.to_vec());

        let pipeline = Pipeline::from_config(&config, &Pipeline::DEFAULT_PASSES);
        assert_eq!(pipeline.passes(), vec![Pass::Contrast, Pass::Dedup]);
    }

    #[test]
    fn test_later_passes_see_earlier_moves() {
        let temp_dir = TempDir::new().unwrap();
        // Two identical flat frames: the contrast pass takes both, so dedup
        // has nothing left to compare.
        save_gray(&flat_image(40, 40, 90), &temp_dir.path().join("a.png"));
        save_gray(&flat_image(40, 40, 90), &temp_dir.path().join("b.png"));
        save_gray(
            &block_image(8, 3, |row, col| row < col),
            &temp_dir.path().join("c.png"),
        );

        let config = FilterConfig::default();
        let mut session = Session::new(&config);
        let reports = Pipeline::from_config(&config, &Pipeline::DEFAULT_PASSES)
            .run(temp_dir.path(), &mut session)
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].pass, Pass::Contrast);
        assert_eq!(reports[0].relocated().count(), 2);
        assert_eq!(reports[1].pass, Pass::Dedup);
        assert_eq!(reports[1].scanned, 1);
        assert!(reports[1].flagged.is_empty());
    }

    #[test]
    fn test_dry_run_passes_share_the_ledger() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&flat_image(40, 40, 90), &temp_dir.path().join("a.png"));
        save_gray(&flat_image(40, 40, 90), &temp_dir.path().join("b.png"));

        let config = FilterConfig {
            dry_run: true,
            ..FilterConfig::default()
        };
        let mut session = Session::new(&config);
        let reports = Pipeline::from_config(&config, &Pipeline::DEFAULT_PASSES)
            .run(temp_dir.path(), &mut session)
            .unwrap();

        assert_eq!(reports[0].relocated().count(), 2);
        assert_eq!(reports[1].scanned, 0);
        assert!(temp_dir.path().join("a.png").exists());
        assert!(!temp_dir.path().join("low_contrast").exists());
    }

    #[test]
    fn test_cancelled_pipeline_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        save_gray(&flat_image(40, 40, 90), &temp_dir.path().join("a.png"));

        let config = FilterConfig::default();
        let mut session = Session::new(&config);
        session.cancel();
        let result = Pipeline::from_config(&config, &Pass::ALL).run(temp_dir.path(), &mut session);

        assert!(matches!(result, Err(FilterError::Cancelled)));
        assert!(temp_dir.path().join("a.png").exists());
    }
}
