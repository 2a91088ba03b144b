//! `url()` rewriting for imported stylesheets.
//!
//! Once an imported file is inlined into the entry, a relative `url(img/a.png)`
//! written next to that file would resolve against the entry's directory.
//! [`UrlRewriter`] looks each such target up from the file that wrote it and
//! re-expresses it relative to the entry. Targets that cannot be found are
//! left unchanged.

use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

use crate::config::UrlResolveConfig;
use crate::path::{has_url_scheme, is_scheme_relative, normalize_separators, relative_path};
use crate::runtime::{self, Runtime};

/// `url(...)` calls with a quoted or bare single argument. The first group
/// is the character before `url` so that identifiers such as `my-url(` are
/// not matched.
static URL_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(^|[^\w$-])url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]+))\s*\)"#)
        .expect("url() pattern is valid")
});

#[derive(Debug, Clone)]
pub struct UrlRewriter {
    runtime: Arc<dyn Runtime>,
    entry_dir: PathBuf,
    /// `resolveUrl.paths` followed by the native search paths, absolute.
    paths: Vec<PathBuf>,
    nocheck: bool,
}

impl UrlRewriter {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        entry: &Path,
        config: &UrlResolveConfig,
        search_paths: &[PathBuf],
    ) -> Self {
        let cwd = runtime.get_cwd().unwrap_or_default();
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in config.paths.iter().chain(search_paths) {
            let dir = cwd.join(path).clean();
            if !paths.contains(&dir) {
                paths.push(dir);
            }
        }

        Self {
            runtime,
            entry_dir: entry.parent().map(Path::to_path_buf).unwrap_or_default(),
            paths,
            nocheck: config.nocheck,
        }
    }

    /// Rewrite every `url()` in `text`, a line written in `file`.
    pub fn rewrite<'t>(&self, text: &'t str, file: &Path) -> Cow<'t, str> {
        if !text.to_ascii_lowercase().contains("url(") {
            return Cow::Borrowed(text);
        }

        URL_CALL_RE.replace_all(text, |caps: &Captures<'_>| {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let (href, bare) = match (caps.get(2), caps.get(3), caps.get(4)) {
                (Some(m), _, _) | (_, Some(m), _) => (m.as_str(), false),
                (_, _, Some(m)) => (m.as_str(), true),
                _ => return whole.to_string(),
            };
            if bare && href.starts_with('$') {
                return whole.to_string();
            }
            format!("{}url(\"{}\")", prefix, self.resolve(href, file))
        })
    }

    /// Resolve the last `!`-separated component of `href`.
    fn resolve(&self, href: &str, file: &Path) -> String {
        match href.rsplit_once('!') {
            Some((loaders, target)) => format!("{}!{}", loaders, self.resolve_target(target, file)),
            None => self.resolve_target(href, file),
        }
    }

    fn resolve_target(&self, target: &str, file: &Path) -> String {
        let split = target.find(|c: char| c == '?' || c == '#').unwrap_or(target.len());
        let (pathname, tail) = target.split_at(split);
        if pathname.is_empty()
            || pathname.starts_with('/')
            || has_url_scheme(target)
            || is_scheme_relative(target)
        {
            return target.to_string();
        }

        let dir = file.parent().unwrap_or(file);
        let found = if self.nocheck {
            Some(dir.join(pathname).clean())
        } else {
            self.lookup(pathname, dir)
        };

        match found {
            Some(found) => {
                let relative = normalize_separators(&relative_path(&self.entry_dir, &found));
                trace!(url = target, resolved = %relative.display(), "Rewrote url()");
                format!("{}{}", relative.to_string_lossy(), tail)
            }
            None => target.to_string(),
        }
    }

    fn lookup(&self, pathname: &str, dir: &Path) -> Option<PathBuf> {
        std::iter::once(dir)
            .chain(self.paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(pathname).clean())
            .find(|candidate| runtime::is_file(self.runtime.as_ref(), candidate))
    }
}
