use crate::config::FilterConfig;
use crate::core::FilterError;
use crate::core::relocate::{MoveOutcome, RelocateError, Relocator};
use crate::core::scanner::{ImageSet, ScanError};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// State shared by the passes of one run: the relocator (and its dry-run
/// ledger) and the cancellation flag checked between images.
pub struct Session {
    relocator: Relocator,
    extensions: Vec<String>,
    cancellation_token: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            relocator: Relocator::new(config.dry_run),
            extensions: config.extensions.clone(),
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }

    pub fn check_cancelled(&self) -> Result<(), FilterError> {
        if self.is_cancelled() {
            Err(FilterError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.relocator.is_dry_run()
    }

    /// Scan `dir`, leaving out files that an earlier dry-run pass already
    /// planned to move.
    pub fn scan(&self, dir: &Path) -> Result<ImageSet, ScanError> {
        let mut images = ImageSet::scan(dir, &self.extensions)?;
        if self.relocator.is_dry_run() {
            images.retain(|p| self.relocator.is_present(p));
        }
        Ok(images)
    }

    pub fn is_present(&self, path: &Path) -> bool {
        self.relocator.is_present(path)
    }

    pub fn relocate(&mut self, src: &Path, dest_dir: &Path) -> Result<MoveOutcome, RelocateError> {
        self.relocator.relocate(src, dest_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_shared_token_cancels_session() {
        let token = Arc::new(AtomicBool::new(false));
        let session = Session::new(&FilterConfig::default()).with_cancellation_token(token.clone());
        assert!(session.check_cancelled().is_ok());

        token.store(true, Ordering::Relaxed);
        assert!(session.is_cancelled());
        assert!(matches!(session.check_cancelled(), Err(FilterError::Cancelled)));
    }

    #[test]
    fn test_dry_run_scan_hides_planned_moves() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"b").unwrap();

        let config = FilterConfig {
            dry_run: true,
            ..FilterConfig::default()
        };
        let mut session = Session::new(&config);
        let outcome = session
            .relocate(&temp_dir.path().join("a.jpg"), &temp_dir.path().join("moved"))
            .unwrap();
        assert!(outcome.is_relocated());

        let images = session.scan(temp_dir.path()).unwrap();
        assert_eq!(images.paths(), &[temp_dir.path().join("b.jpg")]);
        assert!(temp_dir.path().join("a.jpg").exists());
    }
}
