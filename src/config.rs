use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_EXTENSIONS: [&str; 2] = ["jpg", "png"];

pub const DEFAULT_BLUR_THRESHOLD: f64 = 5.0;
pub const DEFAULT_BLUR_WINDOW: usize = 60;
pub const DEFAULT_CONTRAST_THRESHOLD: f64 = 2.0;
pub const DEFAULT_CROP_FRACTION: f64 = 0.1;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
/// Quartiles are not meaningful below this many samples.
pub const MIN_OUTLIER_SAMPLES: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for a whole sieve run. Every section falls back to its defaults
/// when missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// File extensions considered images, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Plan moves without touching the file system.
    pub dry_run: bool,
    pub dedup: DedupConfig,
    pub blur: BlurConfig,
    pub contrast: ContrastConfig,
    pub outliers: OutlierConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            dry_run: false,
            dedup: DedupConfig::default(),
            blur: BlurConfig::default(),
            contrast: ContrastConfig::default(),
            outliers: OutlierConfig::default(),
        }
    }
}

impl FilterConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(invalid("extensions", "at least one extension is required"));
        }
        if !self.blur.threshold.is_finite() {
            return Err(invalid("blur.threshold", "must be a finite number"));
        }
        if !self.contrast.threshold.is_finite() {
            return Err(invalid("contrast.threshold", "must be a finite number"));
        }
        if !(0.0..0.5).contains(&self.contrast.crop_fraction) {
            return Err(invalid(
                "contrast.crop_fraction",
                format!("{} is outside [0, 0.5)", self.contrast.crop_fraction),
            ));
        }
        if !self.outliers.iqr_multiplier.is_finite() || self.outliers.iqr_multiplier < 0.0 {
            return Err(invalid(
                "outliers.iqr_multiplier",
                "must be a non-negative number",
            ));
        }
        if self.outliers.min_samples < MIN_OUTLIER_SAMPLES {
            return Err(invalid(
                "outliers.min_samples",
                format!("must be at least {MIN_OUTLIER_SAMPLES}"),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn resolve(target_dir: &Option<PathBuf>, source: &Path, default_name: &str) -> PathBuf {
    target_dir
        .clone()
        .unwrap_or_else(|| source.join(default_name))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    /// Where duplicates go (default: `<dir>/duplicates`).
    pub target_dir: Option<PathBuf>,
    /// Also relocate images whose hash is one bit away from a kept image.
    pub near_match: bool,
}

impl DedupConfig {
    pub fn target_dir_for(&self, source: &Path) -> PathBuf {
        resolve(&self.target_dir, source, "duplicates")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlurConfig {
    /// Where blurred images go (default: `<dir>/blurred`).
    pub target_dir: Option<PathBuf>,
    /// Images scoring at or below this are blurry.
    pub threshold: f64,
    /// Half-size of the low-frequency square removed from the centred spectrum.
    pub window: usize,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            threshold: DEFAULT_BLUR_THRESHOLD,
            window: DEFAULT_BLUR_WINDOW,
        }
    }
}

impl BlurConfig {
    pub fn target_dir_for(&self, source: &Path) -> PathBuf {
        resolve(&self.target_dir, source, "blurred")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContrastConfig {
    /// Where low-contrast images go (default: `<dir>/low_contrast`).
    pub target_dir: Option<PathBuf>,
    /// Central-crop entropy at or below this is low contrast.
    pub threshold: f64,
    /// Fraction trimmed from each edge before measuring.
    pub crop_fraction: f64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            threshold: DEFAULT_CONTRAST_THRESHOLD,
            crop_fraction: DEFAULT_CROP_FRACTION,
        }
    }
}

impl ContrastConfig {
    pub fn target_dir_for(&self, source: &Path) -> PathBuf {
        resolve(&self.target_dir, source, "low_contrast")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlierConfig {
    /// Where outliers go (default: `<dir>/outliers`).
    pub target_dir: Option<PathBuf>,
    /// Tukey fence multiplier applied to the interquartile range.
    pub iqr_multiplier: f64,
    /// Below this many readable images the pass is skipped.
    pub min_samples: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            min_samples: MIN_OUTLIER_SAMPLES,
        }
    }
}

impl OutlierConfig {
    pub fn target_dir_for(&self, source: &Path) -> PathBuf {
        resolve(&self.target_dir, source, "outliers")
    }
}
