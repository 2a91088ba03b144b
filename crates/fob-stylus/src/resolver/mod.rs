//! Bundler-side module resolution.
//!
//! The walker treats the host bundler's resolver as a black box behind
//! [`ModuleResolver`]. Two instances are used: one resolving requests to
//! stylesheet files and one resolving glob bases to directories.

mod bundler;
mod map;

pub use bundler::{BundlerResolver, ResolveMode};
pub use map::MapResolver;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ResolveConfig;
use crate::glob::GlobError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("Can't resolve '{request}' in '{}': {reason}", .context.display())]
    NotFound {
        request: String,
        context: PathBuf,
        reason: String,
    },

    #[error("'{request}' resolved to '{}', which is not a stylesheet", .path.display())]
    NotStylesheet { request: String, path: PathBuf },

    #[error("No request candidates for '{specifier}'")]
    NoCandidates { specifier: String },

    #[error(transparent)]
    Glob(#[from] GlobError),
}

/// Asynchronous `(context, request) -> path(s)` resolver.
#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
pub trait ModuleResolver: Send + Sync + Debug {
    async fn resolve(&self, context: &Path, request: &str) -> Result<Vec<PathBuf>, ResolveError>;
}

/// The file and directory resolvers used by one walk.
#[derive(Debug, Clone)]
pub struct Resolvers {
    pub file: Arc<dyn ModuleResolver>,
    pub context: Arc<dyn ModuleResolver>,
}

impl Resolvers {
    pub fn new(file: Arc<dyn ModuleResolver>, context: Arc<dyn ModuleResolver>) -> Self {
        Self { file, context }
    }

    /// `oxc_resolver` backed pair built from resolve options.
    pub fn bundler(config: &ResolveConfig) -> Self {
        Self {
            file: Arc::new(BundlerResolver::new(config, ResolveMode::File)),
            context: Arc::new(BundlerResolver::new(config, ResolveMode::Context)),
        }
    }
}
