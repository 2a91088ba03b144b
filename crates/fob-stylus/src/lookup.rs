//! Native path lookup.
//!
//! The preprocessor's own resolution: search directories, the default
//! `.styl` extension, and the index-file and package `main` conventions.

use path_clean::PathClean;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::glob::{self, GlobTask};
use crate::path::is_absolute_path;
use crate::runtime::{self, Runtime};

/// Default extension appended to extensionless imports.
pub const DEFAULT_EXTENSION: &str = ".styl";

/// Append `.styl` unless the path already names a `.styl` or `.css` file.
pub fn with_default_extension(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".styl") || lower.ends_with(".css") {
        path.to_string()
    } else {
        format!("{}{}", path, DEFAULT_EXTENSION)
    }
}

#[derive(Deserialize)]
struct PackageManifest {
    main: Option<String>,
}

/// Native lookup over a runtime and a list of search directories.
#[derive(Debug, Clone, Copy)]
pub struct NativeLookup<'a> {
    runtime: &'a dyn Runtime,
    paths: &'a [PathBuf],
}

impl<'a> NativeLookup<'a> {
    pub fn new(runtime: &'a dyn Runtime, paths: &'a [PathBuf]) -> Self {
        Self { runtime, paths }
    }

    /// Full native resolution of an import specifier from `filename`.
    pub async fn resolve(&self, specifier: &str, filename: &Path) -> Option<Vec<PathBuf>> {
        let with_ext = with_default_extension(specifier);
        if let Some(found) = self.find(&with_ext, filename).await {
            return Some(found);
        }
        self.lookup_index(specifier, filename).await
    }

    /// Look `path` up in the owning file's directory, then in each search
    /// directory.
    pub async fn find(&self, path: &str, filename: &Path) -> Option<Vec<PathBuf>> {
        if is_absolute_path(path) {
            return self.try_path(PathBuf::from(path), path).await;
        }

        for dir in self.search_dirs(filename) {
            if let Some(found) = self.try_path(dir.join(path), path).await {
                return Some(found);
            }
        }
        None
    }

    /// `name/index.styl`, `name/<basename>.styl`, then the `main` entry of a
    /// package under `node_modules`.
    pub async fn lookup_index(&self, name: &str, filename: &Path) -> Option<Vec<PathBuf>> {
        if let Some(found) = self.index_files(name, filename).await {
            return Some(found);
        }
        if name.contains("node_modules") {
            return None;
        }
        self.lookup_package(&format!("node_modules/{}", name), filename)
            .await
    }

    async fn index_files(&self, name: &str, filename: &Path) -> Option<Vec<PathBuf>> {
        if let Some(found) = self.find(&format!("{}/index.styl", name), filename).await {
            return Some(found);
        }

        let base = Path::new(name).file_name()?.to_string_lossy();
        let stem = base
            .strip_suffix(".styl")
            .or_else(|| base.strip_suffix(".STYL"))
            .unwrap_or(&base);
        self.find(&format!("{}/{}.styl", name, stem), filename).await
    }

    async fn lookup_package(&self, dir: &str, filename: &Path) -> Option<Vec<PathBuf>> {
        let Some(manifest_path) = self
            .find(&format!("{}/package.json", dir), filename)
            .await
            .and_then(|found| found.into_iter().next())
        else {
            return self.index_files(dir, filename).await;
        };

        let main = match runtime::read_to_string(self.runtime, &manifest_path).await {
            Ok(text) => serde_json::from_str::<PackageManifest>(&text)
                .ok()
                .and_then(|manifest| manifest.main),
            Err(_) => None,
        };

        let package_dir = manifest_path.parent()?.to_path_buf();
        match main {
            Some(main) => {
                let entry = package_dir.join(main).clean();
                runtime::is_file(self.runtime, &entry).then(|| vec![entry])
            }
            None => {
                self.index_files(&package_dir.to_string_lossy(), filename)
                    .await
            }
        }
    }

    async fn try_path(&self, candidate: PathBuf, path: &str) -> Option<Vec<PathBuf>> {
        let candidate = candidate.clean();
        if !glob::is_glob_request(self.runtime, &candidate, path) {
            trace!(candidate = %candidate.display(), "Native lookup candidate");
            return runtime::is_file(self.runtime, &candidate).then(|| vec![candidate]);
        }

        let task = GlobTask::new(&candidate.to_string_lossy());
        let base = PathBuf::from(&task.base).clean();
        if !runtime::is_directory(self.runtime, &base) {
            return None;
        }
        match glob::expand(self.runtime, &base, &task.pattern).await {
            Ok(found) if !found.is_empty() => Some(found),
            _ => None,
        }
    }

    fn search_dirs(&self, filename: &Path) -> Vec<PathBuf> {
        let cwd = self.runtime.get_cwd().unwrap_or_default();
        let absolute = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf().clean()
            } else {
                cwd.join(path).clean()
            }
        };

        let mut dirs = Vec::with_capacity(self.paths.len() + 1);
        if let Some(parent) = filename.parent() {
            dirs.push(absolute(parent));
        }
        for path in self.paths {
            let dir = absolute(path);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }
}
