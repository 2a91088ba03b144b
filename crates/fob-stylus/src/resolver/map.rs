use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use super::{ModuleResolver, ResolveError};

/// Resolver answering from a fixed request table, independent of context.
///
/// ```rust
/// use fob_stylus::resolver::MapResolver;
///
/// let resolver = MapResolver::new()
///     .with("pkg", "/project/node_modules/pkg/index.styl");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    entries: FxHashMap<String, Vec<PathBuf>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, request: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(request.into(), vec![path.into()]);
        self
    }

    pub fn with_many<I, P>(mut self, request: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.entries
            .insert(request.into(), paths.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl ModuleResolver for MapResolver {
    async fn resolve(&self, context: &Path, request: &str) -> Result<Vec<PathBuf>, ResolveError> {
        self.entries
            .get(request)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                request: request.to_string(),
                context: context.to_path_buf(),
                reason: "no mapping".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_map_resolver() {
        let resolver = MapResolver::new()
            .with("pkg", "/nm/pkg/index.styl")
            .with_many("multi", ["/a.styl", "/b.styl"]);

        assert_eq!(
            resolver.resolve(Path::new("/"), "pkg").await.unwrap(),
            vec![PathBuf::from("/nm/pkg/index.styl")]
        );
        assert_eq!(resolver.resolve(Path::new("/"), "multi").await.unwrap().len(), 2);
        assert!(matches!(
            resolver.resolve(Path::new("/src"), "missing").await,
            Err(ResolveError::NotFound { .. })
        ));
    }
}
