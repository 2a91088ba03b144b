use async_trait::async_trait;
use oxc_resolver::{AliasValue, ResolveOptions, Resolver};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ModuleResolver, ResolveError};
use crate::config::ResolveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Resolve to a `.styl` or `.css` file.
    File,
    /// Resolve to the containing directory (glob bases).
    Context,
}

/// Resolver with the bundler's package semantics: aliases, `node_modules`
/// lookup, package `exports` conditions and main fields.
pub struct BundlerResolver {
    resolver: Resolver,
    mode: ResolveMode,
}

impl fmt::Debug for BundlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundlerResolver")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl BundlerResolver {
    pub fn new(config: &ResolveConfig, mode: ResolveMode) -> Self {
        let alias = config
            .alias
            .iter()
            .map(|(key, target)| (key.clone(), vec![AliasValue::Path(target.clone())]))
            .collect();

        let resolver = Resolver::new(ResolveOptions {
            alias,
            condition_names: config.condition_names.clone(),
            main_fields: config.main_fields.clone(),
            main_files: config.main_files.clone(),
            extensions: config.extensions.clone(),
            modules: config.modules.clone(),
            resolve_to_context: mode == ResolveMode::Context,
            ..Default::default()
        });

        Self { resolver, mode }
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("styl") || ext.eq_ignore_ascii_case("css"))
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl ModuleResolver for BundlerResolver {
    async fn resolve(&self, context: &Path, request: &str) -> Result<Vec<PathBuf>, ResolveError> {
        let resolution = self
            .resolver
            .resolve(context, request)
            .map_err(|e| ResolveError::NotFound {
                request: request.to_string(),
                context: context.to_path_buf(),
                reason: e.to_string(),
            })?;

        let path = resolution.full_path();
        if self.mode == ResolveMode::File && !is_stylesheet(&path) {
            return Err(ResolveError::NotStylesheet {
                request: request.to_string(),
                path,
            });
        }

        debug!(
            request,
            context = %context.display(),
            resolved = %path.display(),
            "Bundler resolver matched"
        );
        Ok(vec![path])
    }
}
