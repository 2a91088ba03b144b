//! In-memory Runtime implementation
//!
//! Virtual file system used for tests and for hosts that feed generated
//! stylesheets to the resolver. Directories are implied by the files stored
//! beneath them.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Runtime backed entirely by in-memory files.
///
/// # Example
///
/// ```rust
/// use fob_stylus::MemoryRuntime;
///
/// let runtime = MemoryRuntime::new("/project");
/// runtime.add_file("src/main.styl", "@import 'child'\n");
/// runtime.add_file("src/child.styl", "a\n  color red\n");
/// assert!(runtime.has_file("/project/src/child.styl"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create an empty runtime with the given working directory.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
        }
    }

    /// Add (or replace) a file. Relative paths are resolved against the cwd.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let normalized = self.normalize(path.as_ref());
        self.files.write().insert(normalized, content.into());
    }

    /// Remove a file, returning whether it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let normalized = self.normalize(path.as_ref());
        self.files.write().remove(&normalized).is_some()
    }

    /// Check if a file is stored at `path`.
    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        let normalized = self.normalize(path.as_ref());
        self.files.read().contains_key(&normalized)
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(normalized))
    }

    fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let normalized = self.normalize(path);
        if let Some(content) = self.files.read().get(&normalized) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
                modified: None,
            });
        }

        if self.is_dir(&normalized) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                modified: None,
            });
        }

        Err(RuntimeError::FileNotFound(normalized))
    }

    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let normalized = self.normalize(path);
        let names: BTreeSet<String> = self
            .files
            .read()
            .keys()
            .filter_map(|file| file.strip_prefix(&normalized).ok())
            .filter_map(|rest| rest.components().next())
            .filter_map(|first| first.as_os_str().to_str().map(String::from))
            .collect();

        if names.is_empty() {
            return Err(RuntimeError::FileNotFound(normalized));
        }

        Ok(names.into_iter().collect())
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
