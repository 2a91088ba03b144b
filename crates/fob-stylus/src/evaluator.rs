//! Render-time import override.
//!
//! The renderer asks an [`ImportOverride`] about every import node before
//! using its own lookup. [`IndexedImportOverride`] answers from the index the
//! dependency walker built.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::graph::{ResolvedDependencyIndex, ResolvedTarget};
use crate::path::is_url_request;
use crate::syntax::SourcePosition;

/// An import node as seen by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct ImportSite<'a> {
    pub file: &'a Path,
    pub position: SourcePosition,
    pub specifier: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDecision {
    /// Import these files, in order, instead of looking the path up.
    Substitute(Vec<PathBuf>),
    /// Use native lookup. `detail` explains why the override had no answer
    /// and is appended to the error if native lookup fails too.
    Defer { detail: Option<String> },
}

impl ImportDecision {
    pub fn defer() -> Self {
        ImportDecision::Defer { detail: None }
    }
}

pub trait ImportOverride: Send + Sync + Debug {
    fn resolve_import(&self, site: ImportSite<'_>) -> ImportDecision;
}

#[derive(Debug, Clone)]
pub struct IndexedImportOverride {
    index: Arc<ResolvedDependencyIndex>,
}

impl IndexedImportOverride {
    pub fn new(index: Arc<ResolvedDependencyIndex>) -> Self {
        Self { index }
    }
}

impl ImportOverride for IndexedImportOverride {
    fn resolve_import(&self, site: ImportSite<'_>) -> ImportDecision {
        if is_url_request(site.specifier) {
            return ImportDecision::defer();
        }

        match self.index.lookup(site.file, site.position, site.specifier) {
            Some(record) => match &record.resolved {
                ResolvedTarget::Failed(failure) => ImportDecision::Defer {
                    detail: Some(failure.message.clone()),
                },
                resolved => ImportDecision::Substitute(resolved.paths().to_vec()),
            },
            None => ImportDecision::defer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyRecord;

    fn override_with(records: Vec<DependencyRecord>) -> IndexedImportOverride {
        let mut index = ResolvedDependencyIndex::new();
        index.insert(PathBuf::from("/p/main.styl"), records);
        IndexedImportOverride::new(Arc::new(index))
    }

    fn site(line: u32, specifier: &str) -> ImportSite<'_> {
        ImportSite {
            file: Path::new("/p/main.styl"),
            position: SourcePosition::new(line, 1),
            specifier,
        }
    }

    #[test]
    fn test_substitutes_recorded_paths() {
        let ov = override_with(vec![DependencyRecord {
            position: SourcePosition::new(1, 1),
            specifier: "glob/*".into(),
            resolved: ResolvedTarget::Many(vec!["/p/glob/a.styl".into(), "/p/glob/b.styl".into()]),
        }]);

        assert_eq!(
            ov.resolve_import(site(1, "glob/*")),
            ImportDecision::Substitute(vec!["/p/glob/a.styl".into(), "/p/glob/b.styl".into()])
        );
        assert_eq!(ov.resolve_import(site(2, "glob/*")), ImportDecision::defer());
    }

    #[test]
    fn test_failure_detail_is_forwarded() {
        let ov = override_with(vec![DependencyRecord {
            position: SourcePosition::new(1, 1),
            specifier: "~missing".into(),
            resolved: ResolvedTarget::failed("Can't resolve 'missing'"),
        }]);

        assert_eq!(
            ov.resolve_import(site(1, "~missing")),
            ImportDecision::Defer {
                detail: Some("Can't resolve 'missing'".into())
            }
        );
    }

    #[test]
    fn test_url_requests_are_never_substituted() {
        let ov = override_with(vec![DependencyRecord {
            position: SourcePosition::new(1, 1),
            specifier: "/abs.styl".into(),
            resolved: ResolvedTarget::Single("/abs.styl".into()),
        }]);
        assert_eq!(ov.resolve_import(site(1, "/abs.styl")), ImportDecision::defer());
    }
}
