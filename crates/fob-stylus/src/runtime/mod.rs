//! Platform runtime abstraction for stylesheet resolution
//!
//! Every file read, stat and directory listing performed by the dependency
//! walker, the glob expander and the renderer goes through the `Runtime`
//! trait. The same resolution logic therefore runs against the real disk
//! (`NativeRuntime`) or an in-memory virtual file system (`MemoryRuntime`).

#[cfg(not(target_family = "wasm"))]
pub mod native;

pub mod memory;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// File metadata
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a file
    pub is_file: bool,
    /// Last modified timestamp (milliseconds since epoch)
    pub modified: Option<u64>,
}

/// Platform runtime trait
///
/// Reads are asynchronous and suspend the calling task; `metadata` is a
/// synchronous stat, matching what a bundler's input file system exposes.
#[cfg(target_family = "wasm")]
#[async_trait(?Send)]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file from the filesystem
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Stat a path
    fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// List the entry names of a directory
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// Platform runtime trait
///
/// Reads are asynchronous and suspend the calling task; `metadata` is a
/// synchronous stat, matching what a bundler's input file system exposes.
#[cfg(not(target_family = "wasm"))]
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file from the filesystem
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Stat a path
    fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// List the entry names of a directory
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// Returns true when `path` exists and is a directory.
pub fn is_directory(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.metadata(path).map(|m| m.is_dir).unwrap_or(false)
}

/// Returns true when `path` exists and is a regular file.
pub fn is_file(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.metadata(path).map(|m| m.is_file).unwrap_or(false)
}

/// Read a file and decode it as UTF-8.
pub async fn read_to_string(runtime: &dyn Runtime, path: &Path) -> RuntimeResult<String> {
    let bytes = runtime.read_file(path).await?;
    String::from_utf8(bytes)
        .map_err(|e| RuntimeError::Other(format!("Invalid UTF-8 in {}: {}", path.display(), e)))
}
