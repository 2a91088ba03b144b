//! Resolution cache shared across compilations of a build session.
//!
//! Entries are keyed by owning file and validated by the file's content hash
//! and the options fingerprint, so an edited file or a changed search path
//! never reuses stale records. Hits are also checked against the file
//! system: a record whose target was deleted forces a fresh resolution.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::graph::DependencyRecord;

/// Hex SHA-256 of a source text.
pub fn content_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: String,
    fingerprint: String,
    records: Vec<DependencyRecord>,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<FxHashMap<PathBuf, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records for `file` if its content and the options are unchanged and
    /// every resolved target still passes `target_exists`. An entry with a
    /// vanished target is dropped.
    pub fn get(
        &self,
        file: &Path,
        content_hash: &str,
        fingerprint: &str,
        target_exists: impl Fn(&Path) -> bool,
    ) -> Option<Vec<DependencyRecord>> {
        let (hit, stale) = {
            let entries = self.entries.read();
            match entries
                .get(file)
                .filter(|entry| entry.content_hash == content_hash && entry.fingerprint == fingerprint)
            {
                Some(entry) => {
                    let stale = entry
                        .records
                        .iter()
                        .flat_map(|record| record.resolved.paths())
                        .any(|target| !target_exists(target.as_path()));
                    ((!stale).then(|| entry.records.clone()), stale)
                }
                None => (None, false),
            }
        };

        if stale {
            trace!(file = %file.display(), "Resolution cache entry has a missing target");
            self.entries.write().remove(file);
        }

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(file = %file.display(), "Resolution cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn insert(
        &self,
        file: PathBuf,
        content_hash: String,
        fingerprint: String,
        records: Vec<DependencyRecord>,
    ) {
        self.entries.write().insert(
            file,
            CacheEntry {
                content_hash,
                fingerprint,
                records,
            },
        );
    }

    /// Drop the entry for `file`, returning whether one existed.
    pub fn invalidate(&self, file: &Path) -> bool {
        self.entries.write().remove(file).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.len(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, entries: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            hits,
            misses,
            entries,
            hit_rate,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses ({:.1}%), {} entries",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.entries
        )
    }
}
