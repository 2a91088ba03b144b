//! Shared test utilities for fob-stylus integration tests

#![allow(dead_code)]

use fob_stylus::{MapResolver, MemoryRuntime, Resolvers, StylusLoader, StylusOptions};
use std::sync::Arc;

/// Project root used by every virtual fixture
pub const ROOT: &str = "/project";

/// Build an in-memory project from `(path, content)` pairs relative to ROOT
pub fn virtual_project(files: &[(&str, &str)]) -> MemoryRuntime {
    let runtime = MemoryRuntime::new(ROOT);
    for (path, content) in files {
        runtime.add_file(path, *content);
    }
    runtime
}

/// Loader over a virtual project with a map-backed bundler resolver
pub fn virtual_loader(
    runtime: &MemoryRuntime,
    file_resolver: MapResolver,
    context_resolver: MapResolver,
    options: StylusOptions,
) -> StylusLoader {
    StylusLoader::new(Arc::new(runtime.clone()), options).with_resolvers(Resolvers::new(
        Arc::new(file_resolver),
        Arc::new(context_resolver),
    ))
}

/// Absolute path of a fixture file
pub fn project_path(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(ROOT).join(relative)
}
