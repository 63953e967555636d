use crate::core::decode::AnalysisError;
use crate::core::relocate::MoveOutcome;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The filtering passes, declared in the order a full run applies them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Contrast,
    Dedup,
    Blur,
    Outliers,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Contrast, Pass::Dedup, Pass::Blur, Pass::Outliers];

    pub fn label(&self) -> &'static str {
        match self {
            Pass::Contrast => "contrast",
            Pass::Dedup => "dedup",
            Pass::Blur => "blur",
            Pass::Outliers => "outliers",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an image was flagged, with the metric that decided it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    SameHash { kept: PathBuf },
    HammingNeighbor { kept: PathBuf },
    Blurry { score: f64 },
    LowContrast { entropy: f64 },
    Outlier { entropy: f64 },
}

impl Reason {
    /// The log line for an image flagged for this reason.
    pub fn describe(&self, path: &Path) -> String {
        match self {
            Reason::SameHash { kept } => format!(
                "{} and {} are similar (same hash)",
                kept.display(),
                path.display()
            ),
            Reason::HammingNeighbor { kept } => format!(
                "{} and {} are similar (Hamming distance 1)",
                kept.display(),
                path.display()
            ),
            Reason::Blurry { score } => format!("{} is blurry ({:.2})", path.display(), score),
            Reason::LowContrast { entropy } => {
                format!("{} has low contrast ({:.2})", path.display(), entropy)
            }
            Reason::Outlier { entropy } => format!(
                "{} is lighter or darker than others ({:.2})",
                path.display(),
                entropy
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Flagged {
    pub path: PathBuf,
    pub reason: Reason,
    #[serde(flatten)]
    pub outcome: MoveOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub path: PathBuf,
    pub error: String,
}

/// What one pass did to one directory.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    pub source: PathBuf,
    pub target_dir: PathBuf,
    pub scanned: usize,
    pub flagged: Vec<Flagged>,
    pub unreadable: Vec<Problem>,
    pub failed: Vec<Problem>,
    pub note: Option<String>,
}

impl PassReport {
    pub fn new(pass: Pass, source: &Path, target_dir: &Path, scanned: usize) -> Self {
        Self {
            pass,
            source: source.to_path_buf(),
            target_dir: target_dir.to_path_buf(),
            scanned,
            flagged: Vec::new(),
            unreadable: Vec::new(),
            failed: Vec::new(),
            note: None,
        }
    }

    /// Paths that left (or, in a dry run, would leave) the source directory.
    pub fn relocated(&self) -> impl Iterator<Item = &Path> {
        self.flagged
            .iter()
            .filter(|f| f.outcome.is_relocated())
            .map(|f| f.path.as_path())
    }

    /// Flagged images that stayed put because of a collision or a vanished file.
    pub fn skipped(&self) -> impl Iterator<Item = &Flagged> {
        self.flagged.iter().filter(|f| !f.outcome.is_relocated())
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub(crate) fn record_unreadable(&mut self, path: &Path, error: &AnalysisError) {
        log::warn!("Skipping {}: {}", path.display(), error);
        self.unreadable.push(Problem {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    /// Relocate a flagged image into this pass's target directory, logging
    /// one line for the action and recording how it went.
    pub(crate) fn flag(&mut self, session: &mut Session, path: &Path, reason: Reason) {
        let message = reason.describe(path);
        match session.relocate(path, &self.target_dir) {
            Ok(outcome) => {
                match &outcome {
                    MoveOutcome::Moved(_) => log::info!("{message}"),
                    MoveOutcome::Planned(target) => {
                        log::info!("{message} [dry-run: → {}]", target.display())
                    }
                    MoveOutcome::Collision(target) => log::warn!(
                        "{message}; {} already exists, leaving it in place",
                        target.display()
                    ),
                    MoveOutcome::Vanished => {
                        log::warn!("{message}; file vanished before it could be moved")
                    }
                }
                self.flagged.push(Flagged {
                    path: path.to_path_buf(),
                    reason,
                    outcome,
                });
            }
            Err(e) => {
                log::error!("{message}; {e}");
                self.failed.push(Problem {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }
}
