#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-stylus
//!
//! Bundler-aware import resolution for Stylus stylesheets.
//!
//! Before a stylesheet is rendered, the dependency walker discovers every
//! file it transitively imports and resolves each import twice over: with
//! the preprocessor's own lookup (search paths, default extension, index
//! files) and, when that fails or the request is package-style (`~pkg`),
//! with the bundler resolver (aliases, `node_modules`, package conditions).
//! Glob imports are split into a resolved base and an expanded tail. The
//! result is installed as an import override for the render pass, and every
//! discovered file is reported as a build dependency. `url()` references in
//! imported files are rewritten so they stay valid from the entry file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fob_stylus::{NativeRuntime, StylusLoader, StylusOptions};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = StylusOptions {
//!     paths: vec!["vendor".into()],
//!     ..Default::default()
//! };
//! let loader = StylusLoader::new(Arc::new(NativeRuntime::new()), options);
//! let output = loader.compile_file(Path::new("src/main.styl")).await?;
//!
//! println!("{}", output.code);
//! for diagnostic in &output.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! # Ok(()) }
//! ```

pub mod cache;
pub mod config;
pub mod evaluator;
pub mod glob;
pub mod graph;
pub mod loader;
pub mod lookup;
pub mod path;
pub mod render;
pub mod resolver;
pub mod runtime;
pub mod sequencer;
pub mod syntax;
pub mod url;
pub mod visitor;

pub use cache::{CacheStats, ResolutionCache};
pub use config::{ResolveConfig, StylusOptions, UrlResolveConfig};
pub use evaluator::{ImportDecision, ImportOverride, ImportSite, IndexedImportOverride};
pub use graph::{
    DependencyRecord, DependencyWalker, Diagnostic, DiagnosticKind, ResolvedDependencyIndex,
    ResolvedTarget, Severity, WalkError, WalkOptions, WalkOutput,
};
pub use loader::{LoaderError, LoaderOutput, StylusLoader};
pub use render::{RenderError, RenderOptions, RenderOutput, Renderer};
pub use resolver::{BundlerResolver, MapResolver, ModuleResolver, ResolveError, Resolvers};
pub use runtime::memory::MemoryRuntime;
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};
pub use syntax::{ImportKind, ParseError, SourcePosition, StylesheetParser};
pub use url::UrlRewriter;

#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;

/// Error type for loader operations.
pub type Error = LoaderError;

/// Result type alias for fob-stylus operations.
pub type Result<T> = std::result::Result<T, Error>;
