//! Loader options.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options affecting how stylesheets are resolved and rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylusOptions {
    /// Extra search directories for native lookup, tried in order.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Specifiers imported at the top of every entry file.
    #[serde(default)]
    pub import: Vec<String>,

    /// Added to `paths` after the configured entries.
    #[serde(default)]
    pub include: Vec<PathBuf>,

    /// Inline `.css` imports instead of leaving them literal.
    #[serde(default)]
    pub include_css: bool,

    /// Pre-resolve imports with the bundler resolver.
    #[serde(default = "default_true")]
    pub webpack_importer: bool,

    /// Source text prepended to the entry file.
    #[serde(default)]
    pub additional_data: Option<String>,

    /// Base for root-relative requests and for the `sources` list.
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub resolve: ResolveConfig,

    /// `url()` rewriting for imported files. Accepts `false` or a settings
    /// object.
    #[serde(default)]
    pub resolve_url: UrlResolveConfig,
}

impl Default for StylusOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            import: Vec::new(),
            include: Vec::new(),
            include_css: false,
            webpack_importer: true,
            additional_data: None,
            root: None,
            resolve: ResolveConfig::default(),
            resolve_url: UrlResolveConfig::default(),
        }
    }
}

impl StylusOptions {
    /// `paths` followed by `include`, without duplicates.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::with_capacity(self.paths.len() + self.include.len());
        for path in self.paths.iter().chain(&self.include) {
            if !out.contains(path) {
                out.push(path.clone());
            }
        }
        out
    }

    /// Root directory as a string request prefix.
    pub fn root_request(&self) -> Option<String> {
        self.root
            .as_deref()
            .map(Path::to_string_lossy)
            .map(|root| root.into_owned())
    }

    /// Hash of every option that can change how an import resolves.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for path in self.search_paths() {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update([0]);
        }
        hasher.update([self.webpack_importer as u8, 0]);
        if let Some(root) = &self.root {
            hasher.update(root.to_string_lossy().as_bytes());
        }
        hasher.update([0]);
        if let Ok(resolve) = serde_json::to_vec(&self.resolve) {
            hasher.update(&resolve);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Bundler resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConfig {
    /// Request prefix to path replacements.
    #[serde(default)]
    pub alias: BTreeMap<String, String>,

    #[serde(default = "default_condition_names")]
    pub condition_names: Vec<String>,

    #[serde(default = "default_main_fields")]
    pub main_fields: Vec<String>,

    #[serde(default = "default_main_files")]
    pub main_files: Vec<String>,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Package directories searched for bare requests.
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            alias: BTreeMap::new(),
            condition_names: default_condition_names(),
            main_fields: default_main_fields(),
            main_files: default_main_files(),
            extensions: default_extensions(),
            modules: default_modules(),
        }
    }
}

/// How `url()` references in imported files are rewritten so they stay
/// valid relative to the entry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UrlResolveRepr")]
pub struct UrlResolveConfig {
    pub enabled: bool,
    /// Rewrite without checking that the target exists.
    pub nocheck: bool,
    /// Extra directories searched for url targets, before the search paths.
    pub paths: Vec<PathBuf>,
}

impl Default for UrlResolveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nocheck: false,
            paths: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlResolveRepr {
    Toggle(bool),
    Settings {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        nocheck: bool,
        #[serde(default)]
        paths: Vec<PathBuf>,
    },
}

impl From<UrlResolveRepr> for UrlResolveConfig {
    fn from(repr: UrlResolveRepr) -> Self {
        match repr {
            UrlResolveRepr::Toggle(enabled) => Self {
                enabled,
                ..Self::default()
            },
            UrlResolveRepr::Settings {
                enabled,
                nocheck,
                paths,
            } => Self {
                enabled,
                nocheck,
                paths,
            },
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_condition_names() -> Vec<String> {
    vec!["styl".into(), "stylus".into(), "style".into()]
}

fn default_main_fields() -> Vec<String> {
    vec!["styl".into(), "style".into(), "stylus".into(), "main".into()]
}

fn default_main_files() -> Vec<String> {
    vec!["index".into()]
}

fn default_extensions() -> Vec<String> {
    vec![".styl".into(), ".css".into()]
}

fn default_modules() -> Vec<String> {
    vec!["node_modules".into()]
}
