//! Path and URL classification helpers.
//!
//! Used when deciding whether an import specifier is a file-system request
//! at all, when rewriting specifiers into bundler requests, and when
//! normalizing paths for dependency tracking and source lists.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Matches specifiers the compiler handles as URLs: `url(...)` wrappers,
/// fragments, absolute paths and scheme-relative or http(s) URLs.
static URL_REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(?:url\s*\(\s*)?['"]?(?:[#/]|(?:https?:)?//)"#)
        .expect("URL request pattern is valid")
});

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z\d+\-.]*:").expect("scheme pattern is valid"));

static WINDOWS_ABSOLUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]:[\\/]").expect("windows path pattern is valid"));

/// Prefix marking "resolve like a package import" in stylesheet specifiers.
pub const MODULE_REQUEST_PREFIX: char = '~';

/// True for POSIX absolute paths, Windows drive paths and UNC paths.
pub fn is_absolute_path(specifier: &str) -> bool {
    (specifier.starts_with('/') && !specifier.starts_with("//"))
        || WINDOWS_ABSOLUTE_RE.is_match(specifier)
        || specifier.starts_with("\\\\")
}

/// True for `//host/path` style references.
pub fn is_scheme_relative(specifier: &str) -> bool {
    specifier.starts_with("//")
}

/// True when the specifier carries a URL scheme (`http:`, `data:`, ...).
///
/// Windows drive letters are not schemes.
pub fn has_url_scheme(specifier: &str) -> bool {
    SCHEME_RE.is_match(specifier) && !WINDOWS_ABSOLUTE_RE.is_match(specifier)
}

/// True for plain relative paths such as `child`, `./child` or `../a/b`.
pub fn is_relative_path(specifier: &str) -> bool {
    !specifier.is_empty()
        && !is_absolute_path(specifier)
        && !is_scheme_relative(specifier)
        && !has_url_scheme(specifier)
}

/// True when the import is left to the compiler's URL handling and must not
/// be substituted with a resolved path.
pub fn is_url_request(specifier: &str) -> bool {
    URL_REQUEST_RE.is_match(specifier)
}

/// True when the specifier can never name a file: fragments, schemes and
/// scheme-relative URLs. Absolute paths are still files.
pub fn is_external_url(specifier: &str) -> bool {
    specifier.starts_with('#') || is_scheme_relative(specifier) || has_url_scheme(specifier)
}

/// True for `~pkg` style requests.
pub fn is_module_request(specifier: &str) -> bool {
    specifier.starts_with(MODULE_REQUEST_PREFIX)
}

/// Rewrite a stylesheet URL into a bundler request.
///
/// `child` becomes `./child`, `~pkg/a` becomes `pkg/a`, relative paths are
/// kept, and root-relative paths are joined onto `root` when one is given.
pub fn url_to_request(url: &str, root: Option<&str>) -> String {
    if url.is_empty() {
        return String::new();
    }

    let request = if WINDOWS_ABSOLUTE_RE.is_match(url) {
        url.to_string()
    } else if let (Some(root), true) = (root, url.starts_with('/')) {
        if module_prefix_end(root).is_some() {
            let mut root = root.to_string();
            if !root.ends_with('~') && !root.ends_with('/') {
                root.push('/');
            }
            format!("{}{}", root, &url[1..])
        } else {
            format!("{}{}", root, url)
        }
    } else if url.starts_with("./") || url.starts_with("../") {
        url.to_string()
    } else {
        format!("./{}", url)
    };

    match module_prefix_end(&request) {
        Some(end) => request[end..].to_string(),
        None => request,
    }
}

/// Index just past the first `~` that appears before any `?`.
fn module_prefix_end(request: &str) -> Option<usize> {
    let query = request.find('?').unwrap_or(request.len());
    request[..query].find(MODULE_REQUEST_PREFIX).map(|i| i + 1)
}

/// Convert platform separators to forward slashes.
pub fn normalize_separators(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text.contains('\\') {
        PathBuf::from(text.replace('\\', "/"))
    } else {
        path.to_path_buf()
    }
}

/// Strip the `//?/` verbatim prefix Windows resolvers emit and normalize
/// separators.
pub fn normalize_dependency_path(path: &Path) -> PathBuf {
    let normalized = normalize_separators(path);
    let text = normalized.to_string_lossy();
    match text.strip_prefix("//?/") {
        Some(rest) => PathBuf::from(rest),
        None => normalized,
    }
}

/// Express a source path the way source lists show it: relative to `root`
/// with forward slashes. URLs and paths outside `root` are kept as-is.
pub fn normalize_source_path(source: &str, root: &Path) -> String {
    if is_external_url(source) {
        return source.to_string();
    }

    let path = Path::new(source);
    let absolute = if is_absolute_path(source) {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    match absolute.strip_prefix(root) {
        Ok(relative) => normalize_separators(relative).to_string_lossy().into_owned(),
        Err(_) => normalize_separators(&absolute).to_string_lossy().into_owned(),
    }
}

/// Path from directory `from` to `to`, climbing with `..` where the two
/// diverge. Both paths are expected to be absolute and clean.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}
