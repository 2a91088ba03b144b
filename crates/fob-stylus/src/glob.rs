//! Glob import support.
//!
//! A dynamic specifier such as `partials/**/*.styl` is split into a static
//! base (`partials`), resolved like any other request, and a tail pattern
//! expanded against the file system below that base.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::runtime::{self, Runtime, RuntimeError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GlobError {
    #[error("Glob '{pattern}' has no static base directory")]
    MissingBase { pattern: String },

    #[error("Invalid glob '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Glob '{pattern}' matched no .styl files in {}", .base.display())]
    NoMatches { pattern: String, base: PathBuf },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// True when the specifier contains `*`, a `{...}` group or a `[...]` class.
pub fn is_dynamic_pattern(specifier: &str) -> bool {
    if specifier.contains('*') {
        return true;
    }
    has_group(specifier, '{', '}') || has_group(specifier, '[', ']')
}

/// True when `specifier` is expanded as a glob rather than looked up as a
/// path. `candidate` is the path the specifier names literally; an existing
/// file or directory there wins over the pattern.
pub fn is_glob_request(runtime: &dyn Runtime, candidate: &Path, specifier: &str) -> bool {
    is_dynamic_pattern(specifier)
        && !runtime::is_directory(runtime, candidate)
        && !runtime::is_file(runtime, candidate)
}

fn has_group(specifier: &str, open: char, close: char) -> bool {
    specifier
        .find(open)
        .is_some_and(|start| specifier[start + 1..].contains(close))
}

/// A dynamic specifier split into its static base and glob tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobTask {
    /// Leading static directory, `.` when there is none.
    pub base: String,
    /// Pattern relative to `base`.
    pub pattern: String,
}

impl GlobTask {
    pub fn new(specifier: &str) -> Self {
        let segments: Vec<&str> = specifier.split('/').collect();
        let static_len = segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .take_while(|segment| !is_dynamic_pattern(segment))
            .count();

        let base = segments[..static_len].join("/");
        let pattern = segments[static_len..].join("/");

        Self {
            base: if base.is_empty() { ".".to_string() } else { base },
            pattern,
        }
    }

    /// The base request, rejecting globs rooted at the current directory.
    pub fn require_base(&self) -> Result<&str, GlobError> {
        if self.base == "." || self.base.is_empty() {
            return Err(GlobError::MissingBase {
                pattern: self.full_pattern(),
            });
        }
        Ok(&self.base)
    }

    pub fn full_pattern(&self) -> String {
        if self.base == "." {
            self.pattern.clone()
        } else {
            format!("{}/{}", self.base, self.pattern)
        }
    }
}

/// Expand `pattern` below `base` and return matching stylesheets sorted
/// lexicographically. Only `.styl` files are ever returned.
pub async fn expand(
    runtime: &dyn Runtime,
    base: &Path,
    pattern: &str,
) -> Result<Vec<PathBuf>, GlobError> {
    let patterns = expand_braces(pattern)
        .into_iter()
        .map(|p| {
            Pattern::new(&p).map_err(|e| GlobError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.msg.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let max_depth = if pattern.contains("**") {
        None
    } else {
        Some(pattern.split('/').count())
    };

    let mut matches = Vec::new();
    let mut pending = vec![(base.to_path_buf(), String::new(), 1usize)];

    while let Some((dir, prefix, depth)) = pending.pop() {
        for name in runtime.read_dir(&dir).await? {
            let full = dir.join(&name);
            let relative = format!("{}{}", prefix, name);
            let Ok(meta) = runtime.metadata(&full) else {
                continue;
            };

            if meta.is_dir {
                if max_depth.is_none_or(|max| depth < max) {
                    pending.push((full, format!("{}/", relative), depth + 1));
                }
            } else if meta.is_file
                && is_stylus_file(&name)
                && patterns.iter().any(|p| p.matches_with(&relative, options))
            {
                matches.push(full);
            }
        }
    }

    matches.sort();
    matches.dedup();

    debug!(
        base = %base.display(),
        pattern,
        count = matches.len(),
        "Expanded glob import"
    );

    Ok(matches)
}

fn is_stylus_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("styl"))
}

/// Expand `{a,b}` alternatives, which `glob::Pattern` does not support.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{}{}{}", prefix, &pattern[w[0] + 1..w[1]], suffix)))
        .collect()
}
