// Duplicate detection by perceptual hash:
// - Exact duplicates share a hash with an earlier image
// - Near duplicates sit one bit away from a surviving representative
// The first image scanned under a hash is always the one kept.

use crate::config::DedupConfig;
use crate::core::FilterError;
use crate::core::decode::measure_all;
use crate::core::phash::{PerceptualHash, PerceptualHasher};
use crate::core::report::{Pass, PassReport, Reason};
use crate::session::Session;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One representative path per hash, remembered in insertion (scan) order.
#[derive(Debug, Default)]
pub struct HashBucket {
    order: Vec<PerceptualHash>,
    entries: HashMap<PerceptualHash, PathBuf>,
}

impl HashBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under `hash` unless the hash already has a
    /// representative, which is returned instead.
    pub fn insert_first(&mut self, hash: PerceptualHash, path: PathBuf) -> Option<&Path> {
        if self.entries.contains_key(&hash) {
            return self.entries.get(&hash).map(PathBuf::as_path);
        }
        self.order.push(hash);
        self.entries.insert(hash, path);
        None
    }

    pub fn get(&self, hash: &PerceptualHash) -> Option<&Path> {
        self.entries.get(hash).map(PathBuf::as_path)
    }

    pub fn remove(&mut self, hash: &PerceptualHash) -> Option<PathBuf> {
        self.entries.remove(hash)
    }

    /// The hashes currently held, in the order they were first inserted.
    /// Taken as a copy so the bucket can shrink while the caller iterates.
    pub fn snapshot(&self) -> Vec<PerceptualHash> {
        self.order
            .iter()
            .filter(|h| self.entries.contains_key(h))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Deduplicator {
    config: DedupConfig,
    hasher: PerceptualHasher,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            hasher: PerceptualHasher::new(),
        }
    }

    pub fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        let target = self.config.target_dir_for(dir);
        let images = session.scan(dir)?;
        let mut report = PassReport::new(Pass::Dedup, dir, &target, images.len());

        let hashes = measure_all(&images, session, |p| self.hasher.hash_path(p))?;

        let mut bucket = HashBucket::new();
        for (path, hash) in hashes {
            session.check_cancelled()?;
            let hash = match hash {
                Ok(hash) => hash,
                Err(e) => {
                    report.record_unreadable(&path, &e);
                    continue;
                }
            };
            log::debug!("{} hashes to {}", path.display(), hash);

            if let Some(kept) = bucket.insert_first(hash, path.clone()) {
                let reason = Reason::SameHash {
                    kept: kept.to_path_buf(),
                };
                report.flag(session, &path, reason);
            }
        }

        log::debug!("{} distinct hashes in {}", bucket.len(), dir.display());
        if self.config.near_match && !bucket.is_empty() {
            sweep_neighbors(&mut bucket, session, &mut report)?;
        }

        Ok(report)
    }
}

/// For each surviving hash, in scan order, relocate the representatives of
/// its 64 single-bit variants, then retire the hash.
///
/// Retiring keeps the match non-transitive: a hash swept earlier can no
/// longer be matched, but a variant whose file was already relocated still
/// has its own neighbors swept.
fn sweep_neighbors(
    bucket: &mut HashBucket,
    session: &mut Session,
    report: &mut PassReport,
) -> Result<(), FilterError> {
    for hash in bucket.snapshot() {
        session.check_cancelled()?;
        let Some(kept) = bucket.get(&hash).map(Path::to_path_buf) else {
            continue;
        };

        for candidate in hash.neighbors() {
            let Some(other) = bucket.get(&candidate) else {
                continue;
            };
            if !session.is_present(other) {
                log::debug!("{} is no longer in place; skipping", other.display());
                continue;
            }
            let other = other.to_path_buf();
            let reason = Reason::HammingNeighbor { kept: kept.clone() };
            report.flag(session, &other, reason);
        }

        bucket.remove(&hash);
    }
    Ok(())
}
