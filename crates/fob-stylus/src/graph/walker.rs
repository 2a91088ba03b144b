//! Recursive dependency walker.
//!
//! For one file: parse, collect imports, resolve them all concurrently,
//! recurse into newly discovered files, then commit the file's records. The
//! seen-set, index, diagnostics and dependency sets are shared by every
//! in-flight branch behind one mutex. Import cycles are reported from the
//! finished index, so the order in which branches complete does not matter.

use futures::future::join_all;
use parking_lot::Mutex;
use path_clean::PathClean;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    DependencyRecord, Diagnostic, DiagnosticKind, ResolvedDependencyIndex, ResolvedTarget,
    Severity, WalkOutput,
};
use crate::cache::{ResolutionCache, content_hash};
use crate::glob::{self, GlobError, GlobTask, is_dynamic_pattern};
use crate::lookup::NativeLookup;
use crate::path::{is_module_request, normalize_dependency_path};
use crate::resolver::{ResolveError, Resolvers};
use crate::runtime::{self, Runtime, RuntimeError};
use crate::sequencer::{candidate_requests, resolve_requests};
use crate::syntax::{ImportParser, SourcePosition, StylesheetParser};
use crate::visitor::{DiscoveredImport, ImportVisitor};

#[cfg(not(target_family = "wasm"))]
type WalkFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
#[cfg(target_family = "wasm")]
type WalkFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// Hard failures of a walk. Everything else becomes a [`Diagnostic`].
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("Failed to read file '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },
}

/// Options that affect how imports resolve.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Native lookup search directories.
    pub paths: Vec<PathBuf>,
    /// Prefix for root-relative bundler requests.
    pub root: Option<String>,
    /// Cache key component covering the options above.
    pub fingerprint: String,
}

#[derive(Debug)]
pub struct DependencyWalker {
    runtime: Arc<dyn Runtime>,
    parser: Arc<dyn StylesheetParser>,
    resolvers: Resolvers,
    options: WalkOptions,
    cache: Option<Arc<ResolutionCache>>,
}

impl DependencyWalker {
    pub fn new(runtime: Arc<dyn Runtime>, resolvers: Resolvers, options: WalkOptions) -> Self {
        Self {
            runtime,
            parser: Arc::new(ImportParser::new()),
            resolvers,
            options,
            cache: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn StylesheetParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Reuse records across walks for files whose content is unchanged.
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Read `entry` and walk it. A missing entry is the only hard failure.
    pub async fn walk_file(&self, entry: &Path) -> Result<WalkOutput, WalkError> {
        let entry = self.absolute(entry);
        let source = runtime::read_to_string(self.runtime.as_ref(), &entry)
            .await
            .map_err(|source| WalkError::ReadFile {
                path: entry.clone(),
                source,
            })?;
        Ok(self.walk(&entry, &source).await)
    }

    /// Walk `entry` whose content is `source`.
    pub async fn walk(&self, entry: &Path, source: &str) -> WalkOutput {
        let entry = self.absolute(entry);
        let walk = Walk {
            walker: self,
            state: Mutex::new(WalkState::default()),
        };

        walk.state.lock().seen.insert(entry.clone());
        walk.visit(entry.clone(), source.to_string()).await;

        let mut state = walk.state.into_inner();
        for (file, position, target) in state.index.back_edges(&entry) {
            let message = format!(
                "import cycle: '{}' imports '{}'",
                file.display(),
                target.display()
            );
            warn!(file = %file.display(), kind = ?DiagnosticKind::ImportCycle, "{}", message);
            state.diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                kind: DiagnosticKind::ImportCycle,
                file,
                position: Some(position),
                message,
            });
        }
        state.diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.position.cmp(&b.position))
        });

        debug!(
            entry = %entry.display(),
            files = state.index.len(),
            dependencies = state.file_dependencies.len(),
            diagnostics = state.diagnostics.len(),
            "Dependency walk complete"
        );

        WalkOutput {
            index: state.index,
            diagnostics: state.diagnostics,
            file_dependencies: state.file_dependencies,
            context_dependencies: state.context_dependencies,
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

#[derive(Default)]
struct WalkState {
    seen: FxHashSet<PathBuf>,
    index: ResolvedDependencyIndex,
    diagnostics: Vec<Diagnostic>,
    file_dependencies: BTreeSet<PathBuf>,
    context_dependencies: BTreeSet<PathBuf>,
}

struct Walk<'w> {
    walker: &'w DependencyWalker,
    state: Mutex<WalkState>,
}

impl<'w> Walk<'w> {
    fn runtime(&self) -> &dyn Runtime {
        self.walker.runtime.as_ref()
    }

    fn diagnose(
        &self,
        severity: Severity,
        kind: DiagnosticKind,
        file: &Path,
        position: Option<SourcePosition>,
        message: String,
    ) {
        warn!(file = %file.display(), kind = ?kind, "{}", message);
        self.state.lock().diagnostics.push(Diagnostic {
            severity,
            kind,
            file: file.to_path_buf(),
            position,
            message,
        });
    }

    /// Each file is visited once; cycles are found on the finished index.
    fn visit<'a>(&'a self, file: PathBuf, source: String) -> WalkFuture<'a> {
        Box::pin(async move {
            let sheet = match self.walker.parser.parse(&source, &file) {
                Ok(sheet) => sheet,
                Err(err) => {
                    self.diagnose(
                        Severity::Error,
                        DiagnosticKind::ParseError,
                        &file,
                        Some(SourcePosition::new(err.line, err.column)),
                        err.to_string(),
                    );
                    self.state.lock().index.insert(file, Vec::new());
                    return;
                }
            };

            let imports = ImportVisitor::new().visit(&sheet);
            let records = self.resolve_all(&file, &source, &imports).await;

            let mut children = Vec::new();
            {
                let mut state = self.state.lock();
                for record in &records {
                    for path in record.resolved.paths() {
                        state.file_dependencies.insert(path.clone());
                        if state.seen.insert(path.clone()) {
                            children.push(path.clone());
                        }
                    }
                }
            }

            join_all(children.into_iter().map(|child| self.read_and_visit(child))).await;

            self.state.lock().index.insert(file, records);
        })
    }

    async fn read_and_visit(&self, file: PathBuf) {
        match runtime::read_to_string(self.runtime(), &file).await {
            Ok(source) => self.visit(file, source).await,
            Err(err) => {
                self.diagnose(
                    Severity::Error,
                    DiagnosticKind::FileRead,
                    &file,
                    None,
                    format!("Failed to read '{}': {}", file.display(), err),
                );
                self.state.lock().index.insert(file, Vec::new());
            }
        }
    }

    async fn resolve_all(
        &self,
        file: &Path,
        source: &str,
        imports: &[DiscoveredImport],
    ) -> Vec<DependencyRecord> {
        let fingerprint = &self.walker.options.fingerprint;
        // Glob results depend on directory contents, not on this file.
        let cacheable = !imports.iter().any(|i| is_dynamic_pattern(&i.specifier));
        let cache = self.walker.cache.as_deref().filter(|_| cacheable);
        let hash = cache.map(|_| content_hash(source));

        if let (Some(cache), Some(hash)) = (cache, hash.as_deref()) {
            if let Some(records) =
                cache.get(file, hash, fingerprint, |target| runtime::is_file(self.runtime(), target))
            {
                return records;
            }
        }

        let records: Vec<DependencyRecord> =
            join_all(imports.iter().map(|import| self.resolve_import(file, import))).await;

        if let (Some(cache), Some(hash)) = (cache, hash) {
            if records.iter().all(|record| !record.resolved.is_failed()) {
                cache.insert(file.to_path_buf(), hash, fingerprint.clone(), records.clone());
            }
        }

        records
    }

    async fn resolve_import(&self, file: &Path, import: &DiscoveredImport) -> DependencyRecord {
        let specifier = import.specifier.as_str();
        let dir = file.parent().unwrap_or(file);
        let is_glob = glob::is_glob_request(self.runtime(), &dir.join(specifier).clean(), specifier);

        let result = if is_glob {
            self.resolve_glob(dir, specifier).await
        } else {
            self.resolve_static(file, dir, specifier).await
        };

        let resolved = match result {
            Ok(paths) if !paths.is_empty() => {
                debug!(
                    file = %file.display(),
                    specifier,
                    count = paths.len(),
                    "Resolved import"
                );
                ResolvedTarget::from_paths(
                    paths.iter().map(|p| normalize_dependency_path(p)).collect(),
                )
            }
            Ok(_) => ResolvedTarget::failed(format!("'{}' resolved to no files", specifier)),
            Err(err) => {
                if is_glob {
                    self.diagnose(
                        Severity::Warning,
                        DiagnosticKind::UnresolvedImport,
                        file,
                        Some(import.position),
                        err.to_string(),
                    );
                } else {
                    debug!(
                        file = %file.display(),
                        specifier,
                        error = %err,
                        "Import left to native resolution"
                    );
                }
                ResolvedTarget::failed(err.to_string())
            }
        };

        DependencyRecord {
            position: import.position,
            specifier: import.specifier.clone(),
            resolved,
        }
    }

    async fn resolve_static(
        &self,
        file: &Path,
        dir: &Path,
        specifier: &str,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        if !is_module_request(specifier) {
            let lookup = NativeLookup::new(self.runtime(), &self.walker.options.paths);
            if let Some(found) = lookup.resolve(specifier, file).await {
                return Ok(found);
            }
        }

        let requests = candidate_requests(specifier, self.walker.options.root.as_deref());
        resolve_requests(self.walker.resolvers.file.as_ref(), dir, specifier, &requests).await
    }

    async fn resolve_glob(&self, dir: &Path, specifier: &str) -> Result<Vec<PathBuf>, ResolveError> {
        let task = GlobTask::new(specifier);
        let base = task.require_base()?;

        let requests = candidate_requests(base, self.walker.options.root.as_deref());
        let base_dir = match resolve_requests(
            self.walker.resolvers.context.as_ref(),
            dir,
            base,
            &requests,
        )
        .await
        {
            Ok(mut dirs) if !dirs.is_empty() => dirs.swap_remove(0),
            other => {
                let candidate = dir.join(base).clean();
                if is_module_request(base) || !runtime::is_directory(self.runtime(), &candidate) {
                    return Err(other.err().unwrap_or_else(|| ResolveError::NoCandidates {
                        specifier: base.to_string(),
                    }));
                }
                candidate
            }
        };

        self.state
            .lock()
            .context_dependencies
            .insert(normalize_dependency_path(&base_dir));

        let found = glob::expand(self.runtime(), &base_dir, &task.pattern).await?;
        if found.is_empty() {
            return Err(GlobError::NoMatches {
                pattern: specifier.to_string(),
                base: base_dir,
            }
            .into());
        }
        Ok(found)
    }
}
