use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Failed to list {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

/// The image files sitting directly inside one directory.
///
/// Paths are ordered by file name, byte-wise, independent of the order the
/// operating system lists them in. Detectors rely on this order: whichever
/// image comes first is the one that is kept.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl ImageSet {
    /// List `dir` (non-recursively), keeping regular files whose extension is
    /// one of `extensions`.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self, ScanError> {
        if !dir.exists() {
            return Err(ScanError::InvalidPath {
                path: dir.to_string_lossy().to_string(),
            });
        }
        if !dir.is_dir() {
            return Err(ScanError::InvalidPath {
                path: format!("{} is not a directory", dir.to_string_lossy()),
            });
        }

        let allowed = normalize_extensions(extensions);
        let mut paths = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The directory itself could not be read.
                Err(source) if source.depth() == 0 => {
                    return Err(ScanError::Walk {
                        path: dir.display().to_string(),
                        source,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if path.is_file() && has_extension(path, &allowed) {
                paths.push(entry.into_path());
            }
        }

        log::debug!("Found {} images in {}", paths.len(), dir.display());

        Ok(Self {
            root: dir.to_path_buf(),
            paths,
        })
    }

    /// Drop paths for which `keep` returns false, preserving order.
    pub fn retain<F: FnMut(&Path) -> bool>(&mut self, mut keep: F) {
        self.paths.retain(|p| keep(p));
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn normalize_extensions(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn has_extension(path: &Path, allowed: &HashSet<String>) -> bool {
    path.extension()
        .map(|ext| allowed.contains(&ext.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}
