//! Dependency graph of a stylesheet compilation.
//!
//! The walker fills a [`ResolvedDependencyIndex`] keyed by owning file; the
//! render-time override reads it back by `(file, position, specifier)`.

mod walker;

pub use walker::{DependencyWalker, WalkError, WalkOptions};

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::syntax::SourcePosition;

/// Why an import could not be resolved by the bundler pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub message: String,
}

/// Outcome of resolving one import occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ResolvedTarget {
    Single(PathBuf),
    /// Glob expansion or multi-match lookup, in rendering order.
    Many(Vec<PathBuf>),
    Failed(ResolutionFailure),
}

impl ResolvedTarget {
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        if paths.len() == 1 {
            ResolvedTarget::Single(paths.remove(0))
        } else {
            ResolvedTarget::Many(paths)
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ResolvedTarget::Failed(ResolutionFailure {
            message: message.into(),
        })
    }

    /// Resolved paths; empty for failures.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            ResolvedTarget::Single(path) => std::slice::from_ref(path),
            ResolvedTarget::Many(paths) => paths,
            ResolvedTarget::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResolvedTarget::Failed(_))
    }
}

/// One import occurrence and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub position: SourcePosition,
    pub specifier: String,
    pub resolved: ResolvedTarget,
}

/// Owning file to its ordered import records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedDependencyIndex {
    files: BTreeMap<PathBuf, Vec<DependencyRecord>>,
}

impl ResolvedDependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: PathBuf, records: Vec<DependencyRecord>) {
        self.files.insert(file, records);
    }

    pub fn records(&self, file: &Path) -> Option<&[DependencyRecord]> {
        self.files.get(file).map(Vec::as_slice)
    }

    /// Record for the import at `position` in `file` with `specifier` text.
    pub fn lookup(
        &self,
        file: &Path,
        position: SourcePosition,
        specifier: &str,
    ) -> Option<&DependencyRecord> {
        self.files.get(file)?.iter().find(|record| {
            record.position == position && record.specifier == specifier
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[DependencyRecord])> {
        self.files
            .iter()
            .map(|(file, records)| (file.as_path(), records.as_slice()))
    }

    /// Import edges that close a cycle, found by a depth-first pass from
    /// `entry` and then from every other indexed file. Each edge is
    /// `(file, position, target)` where `target` is still on the import
    /// chain leading to `file`.
    pub fn back_edges(&self, entry: &Path) -> Vec<(PathBuf, SourcePosition, PathBuf)> {
        #[derive(Clone, Copy)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: FxHashMap<&Path, Mark> = FxHashMap::default();
        let mut found = Vec::new();

        let entry = self.files.get_key_value(entry).map(|(file, _)| file.as_path());
        for root in entry.into_iter().chain(self.files()) {
            if marks.contains_key(root) {
                continue;
            }
            marks.insert(root, Mark::Active);
            let mut stack = vec![(root, self.edges(root), 0usize)];

            while let Some(top) = stack.last_mut() {
                let Some(&(position, target)) = top.1.get(top.2) else {
                    marks.insert(top.0, Mark::Done);
                    stack.pop();
                    continue;
                };
                top.2 += 1;
                let file = top.0;

                match marks.get(target) {
                    Some(Mark::Active) => {
                        found.push((file.to_path_buf(), position, target.to_path_buf()))
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, self.edges(target), 0));
                    }
                }
            }
        }
        found
    }

    fn edges(&self, file: &Path) -> Vec<(SourcePosition, &Path)> {
        self.records(file)
            .unwrap_or_default()
            .iter()
            .flat_map(|record| {
                record
                    .resolved
                    .paths()
                    .iter()
                    .map(move |path| (record.position, path.as_path()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    ParseError,
    FileRead,
    UnresolvedImport,
    ImportCycle,
}

/// Soft failure reported to the host without stopping the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub file: PathBuf,
    pub position: Option<SourcePosition>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(position) = self.position {
            write!(f, ":{}", position)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything one walk produced.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkOutput {
    pub index: ResolvedDependencyIndex,
    pub diagnostics: Vec<Diagnostic>,
    /// Every resolved stylesheet, separator-normalized.
    pub file_dependencies: BTreeSet<PathBuf>,
    /// Glob base directories to watch for added files.
    pub context_dependencies: BTreeSet<PathBuf>,
}
