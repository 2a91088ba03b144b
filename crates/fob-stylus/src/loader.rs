//! Loader pipeline: pre-resolve imports, render, report dependencies.
//!
//! [`StylusLoader::walk_file`] runs the pre-resolve step alone for callers
//! that only need the dependency graph.

use path_clean::PathClean;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::ResolutionCache;
use crate::config::StylusOptions;
use crate::evaluator::{ImportOverride, IndexedImportOverride};
use crate::graph::{
    Diagnostic, DependencyWalker, ResolvedDependencyIndex, WalkOptions, WalkOutput,
};
use crate::path::{normalize_dependency_path, normalize_source_path};
use crate::render::{RenderError, RenderOptions, Renderer};
use crate::resolver::Resolvers;
use crate::runtime::{self, Runtime, RuntimeError};
use crate::syntax::{ImportParser, StylesheetParser};

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Failed to read entry '{}': {source}", .path.display())]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result of compiling one entry stylesheet.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOutput {
    pub code: String,
    /// Every stylesheet the build must watch.
    pub file_dependencies: BTreeSet<PathBuf>,
    /// Glob base directories the build must watch.
    pub context_dependencies: BTreeSet<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// Contributing files relative to the root, entry first.
    pub sources: Vec<String>,
    /// Bundler pre-pass results; empty when the pre-pass is disabled.
    pub index: ResolvedDependencyIndex,
}

/// Compiles stylesheets with bundler-resolved imports.
///
/// ```rust,no_run
/// use fob_stylus::{NativeRuntime, StylusLoader, StylusOptions};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> fob_stylus::Result<()> {
/// let loader = StylusLoader::new(Arc::new(NativeRuntime::new()), StylusOptions::default());
/// let output = loader.compile_file(Path::new("src/main.styl")).await?;
/// for dep in &output.file_dependencies {
///     println!("{}", dep.display());
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct StylusLoader {
    runtime: Arc<dyn Runtime>,
    options: StylusOptions,
    resolvers: Resolvers,
    parser: Arc<dyn StylesheetParser>,
    cache: Option<Arc<ResolutionCache>>,
}

impl StylusLoader {
    pub fn new(runtime: Arc<dyn Runtime>, options: StylusOptions) -> Self {
        let resolvers = Resolvers::bundler(&options.resolve);
        Self {
            runtime,
            options,
            resolvers,
            parser: Arc::new(ImportParser::new()),
            cache: None,
        }
    }

    pub fn with_resolvers(mut self, resolvers: Resolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn StylesheetParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Share resolution results across compilations. Without a cache every
    /// compilation resolves from scratch.
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &StylusOptions {
        &self.options
    }

    /// Read and compile `resource_path`.
    pub async fn compile_file(&self, resource_path: &Path) -> Result<LoaderOutput, LoaderError> {
        let resource_path = self.absolute(resource_path);
        let source = runtime::read_to_string(self.runtime.as_ref(), &resource_path)
            .await
            .map_err(|source| LoaderError::ReadEntry {
                path: resource_path.clone(),
                source,
            })?;
        self.compile(&resource_path, &source).await
    }

    /// Read `resource_path` and walk its imports without rendering.
    ///
    /// The walk sees the same prepared source as [`compile`](Self::compile):
    /// `additional_data` and the configured `import` list come first.
    pub async fn walk_file(&self, resource_path: &Path) -> Result<WalkOutput, LoaderError> {
        let resource_path = self.absolute(resource_path);
        let source = runtime::read_to_string(self.runtime.as_ref(), &resource_path)
            .await
            .map_err(|source| LoaderError::ReadEntry {
                path: resource_path.clone(),
                source,
            })?;
        Ok(self.walk(&resource_path, &source).await)
    }

    /// Walk the imports of `source` as the content of `resource_path`.
    pub async fn walk(&self, resource_path: &Path, source: &str) -> WalkOutput {
        let resource_path = self.absolute(resource_path);
        let code = self.prepare_source(source);
        self.walker().walk(&resource_path, &code).await
    }

    /// Compile `source` as the content of `resource_path`.
    pub async fn compile(&self, resource_path: &Path, source: &str) -> Result<LoaderOutput, LoaderError> {
        let resource_path = self.absolute(resource_path);
        let code = self.prepare_source(source);

        info!(file = %resource_path.display(), "Compiling stylesheet");

        let mut output = LoaderOutput::default();
        let resolve_url = &self.options.resolve_url;
        let mut renderer = Renderer::new(
            self.runtime.clone(),
            RenderOptions {
                paths: self.options.search_paths(),
                include_css: self.options.include_css,
                resolve_url: resolve_url.enabled.then(|| resolve_url.clone()),
            },
        )
        .with_parser(self.parser.clone());

        if self.options.webpack_importer {
            let walked = self.walker().walk(&resource_path, &code).await;
            let import_override: Arc<dyn ImportOverride> =
                Arc::new(IndexedImportOverride::new(Arc::new(walked.index.clone())));
            renderer = renderer.with_override(import_override);

            output.index = walked.index;
            output.diagnostics = walked.diagnostics;
            output.file_dependencies = walked.file_dependencies;
            output.context_dependencies = walked.context_dependencies;
        }

        let rendered = renderer.render(&resource_path, &code).await?;

        let root = self.source_root();
        output.sources.push(normalize_source_path(
            &resource_path.to_string_lossy(),
            &root,
        ));
        for import in &rendered.imports {
            output
                .file_dependencies
                .insert(normalize_dependency_path(import));
            output
                .sources
                .push(normalize_source_path(&import.to_string_lossy(), &root));
        }
        output.code = rendered.code;

        debug!(
            file = %resource_path.display(),
            dependencies = output.file_dependencies.len(),
            diagnostics = output.diagnostics.len(),
            "Compiled stylesheet"
        );
        Ok(output)
    }

    fn walker(&self) -> DependencyWalker {
        let walker = DependencyWalker::new(
            self.runtime.clone(),
            self.resolvers.clone(),
            WalkOptions {
                paths: self.options.search_paths(),
                root: self.options.root_request(),
                fingerprint: self.options.fingerprint(),
            },
        )
        .with_parser(self.parser.clone());
        match &self.cache {
            Some(cache) => walker.with_cache(cache.clone()),
            None => walker,
        }
    }

    /// `additional_data`, then one `@import` per configured import, then the
    /// source itself.
    fn prepare_source(&self, source: &str) -> String {
        let mut code = String::new();
        if let Some(data) = &self.options.additional_data {
            code.push_str(data);
            if !data.ends_with('\n') {
                code.push('\n');
            }
        }
        for import in &self.options.import {
            code.push_str(&format!("@import {}\n", quote(import)));
        }
        code.push_str(source);
        code
    }

    fn source_root(&self) -> PathBuf {
        match &self.options.root {
            Some(root) => self.absolute(root),
            None => self.runtime.get_cwd().unwrap_or_default(),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        let path = normalize_dependency_path(path);
        if path.is_absolute() {
            path.clean()
        } else {
            self.runtime
                .get_cwd()
                .unwrap_or_default()
                .join(path)
                .clean()
        }
    }
}

fn quote(specifier: &str) -> String {
    format!(
        "\"{}\"",
        specifier.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;
    use crate::runtime::memory::MemoryRuntime;

    fn loader(runtime: &MemoryRuntime, options: StylusOptions) -> StylusLoader {
        StylusLoader::new(Arc::new(runtime.clone()), options).with_resolvers(Resolvers::new(
            Arc::new(MapResolver::new()),
            Arc::new(MapResolver::new()),
        ))
    }

    #[tokio::test]
    async fn test_additional_data_and_imports_are_prepended() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/vars.styl", "$brand = blue\n");
        let options = StylusOptions {
            additional_data: Some("$debug = true".into()),
            import: vec!["vars".into()],
            ..Default::default()
        };

        let output = loader(&runtime, options)
            .compile(Path::new("/p/main.styl"), "a\n  color $brand\n")
            .await
            .unwrap();

        assert_eq!(output.code, "$debug = true\n$brand = blue\na\n  color $brand\n");
        assert!(output.file_dependencies.contains(Path::new("/p/vars.styl")));
        assert_eq!(output.sources, vec!["main.styl", "vars.styl"]);
    }

    #[tokio::test]
    async fn test_without_bundler_prepass() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/child.styl", "c\n");
        let options = StylusOptions {
            webpack_importer: false,
            ..Default::default()
        };

        let output = loader(&runtime, options)
            .compile(Path::new("main.styl"), "@import 'child'\n")
            .await
            .unwrap();

        assert!(output.index.is_empty());
        assert_eq!(output.code, "c\n");
        assert!(output.file_dependencies.contains(Path::new("/p/child.styl")));
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let runtime = MemoryRuntime::new("/p");
        let err = loader(&runtime, StylusOptions::default())
            .compile_file(Path::new("missing.styl"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::ReadEntry { .. }));
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("a"), "\"a\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }

    #[tokio::test]
    async fn test_walk_sees_prepended_imports() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/design/tokens.styl", "$gap = 4px\n");
        runtime.add_file("/p/main.styl", "a\n  margin $gap\n");
        let options = StylusOptions {
            additional_data: Some("@import 'design/tokens'".into()),
            import: vec!["design/tokens".into()],
            ..Default::default()
        };

        let walked = loader(&runtime, options)
            .walk_file(Path::new("main.styl"))
            .await
            .unwrap();

        let records = walked.index.records(Path::new("/p/main.styl")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position.line, 1);
        assert_eq!(records[1].position.line, 2);
        assert!(walked.file_dependencies.contains(Path::new("/p/design/tokens.styl")));
    }

    #[tokio::test]
    async fn test_url_rewriting_can_be_disabled() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/sub/x.styl", "a\n  background url(img/a.png)\n");
        runtime.add_file("/p/sub/img/a.png", "");

        let rewritten = loader(&runtime, StylusOptions::default())
            .compile(Path::new("/p/main.styl"), "@import 'sub/x'\n")
            .await
            .unwrap();
        assert_eq!(rewritten.code, "a\n  background url(\"sub/img/a.png\")\n");

        let mut options = StylusOptions::default();
        options.resolve_url.enabled = false;
        let literal = loader(&runtime, options)
            .compile(Path::new("/p/main.styl"), "@import 'sub/x'\n")
            .await
            .unwrap();
        assert_eq!(literal.code, "a\n  background url(img/a.png)\n");
    }
}
