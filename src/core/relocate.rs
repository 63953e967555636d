use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("{path} has no file name")]
    NoFileName { path: String },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {from} → {to}: {source}")]
    Move {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },
}

/// What happened to a flagged file. Collisions and vanished files are
/// expected conditions and leave the batch running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "target", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Moved to the contained path.
    Moved(PathBuf),
    /// Dry run: would have been moved to the contained path.
    Planned(PathBuf),
    /// A file with the same name already exists at the target; left in place.
    Collision(PathBuf),
    /// The source disappeared before it could be moved.
    Vanished,
}

impl MoveOutcome {
    /// True for outcomes where the file has left (or would leave) the source.
    pub fn is_relocated(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_) | MoveOutcome::Planned(_))
    }
}

/// Moves flagged files into category directories, keeping only the base name.
///
/// In dry-run mode nothing is touched; planned moves are remembered so that
/// existence checks later in the run see the directory as it would be.
#[derive(Debug, Default)]
pub struct Relocator {
    dry_run: bool,
    planned_sources: HashSet<PathBuf>,
    planned_targets: HashSet<PathBuf>,
}

impl Relocator {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether `path` is still in place, counting planned dry-run moves as done.
    pub fn is_present(&self, path: &Path) -> bool {
        !self.planned_sources.contains(path) && path.is_file()
    }

    fn target_taken(&self, target: &Path) -> bool {
        target.exists() || self.planned_targets.contains(target)
    }

    /// Move `src` into `dest_dir`, creating the directory when needed.
    ///
    /// An existing target is never overwritten, including one created after
    /// the collision check. A file removed by someone else in between is
    /// reported as [`MoveOutcome::Vanished`] rather than as an error.
    pub fn relocate(&mut self, src: &Path, dest_dir: &Path) -> Result<MoveOutcome, RelocateError> {
        let file_name = src.file_name().ok_or_else(|| RelocateError::NoFileName {
            path: src.display().to_string(),
        })?;
        let target = dest_dir.join(file_name);

        if !self.is_present(src) {
            return Ok(MoveOutcome::Vanished);
        }
        if self.target_taken(&target) {
            return Ok(MoveOutcome::Collision(target));
        }

        if self.dry_run {
            self.planned_sources.insert(src.to_path_buf());
            self.planned_targets.insert(target.clone());
            return Ok(MoveOutcome::Planned(target));
        }

        fs::create_dir_all(dest_dir).map_err(|source| RelocateError::CreateDir {
            path: dest_dir.display().to_string(),
            source,
        })?;

        move_no_replace(src, &target)
    }
}

/// Link then unlink, so an existing `target` makes the move fail instead of
/// being replaced. Falls back to a plain rename where hard links are not
/// available, such as across filesystems.
fn move_no_replace(src: &Path, target: &Path) -> Result<MoveOutcome, RelocateError> {
    let move_err = |source| RelocateError::Move {
        from: src.display().to_string(),
        to: target.display().to_string(),
        source,
    };

    match fs::hard_link(src, target) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(src) {
                // Leave exactly one copy behind.
                let _ = fs::remove_file(target);
                return Err(move_err(e));
            }
            Ok(MoveOutcome::Moved(target.to_path_buf()))
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Ok(MoveOutcome::Collision(target.to_path_buf()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !src.exists() => Ok(MoveOutcome::Vanished),
        Err(e) => {
            log::debug!("Hard link into {} failed ({e}); renaming", target.display());
            match fs::rename(src, target) {
                Ok(()) => Ok(MoveOutcome::Moved(target.to_path_buf())),
                Err(e) if e.kind() == io::ErrorKind::NotFound && !src.exists() => {
                    Ok(MoveOutcome::Vanished)
                }
                Err(e) => Err(move_err(e)),
            }
        }
    }
}
