//! Layered loader options.
//!
//! Priority: CLI args > `FOB_STYLUS_*` environment variables > config file > defaults.
//! Nested keys use a double underscore: `FOB_STYLUS_RESOLVE__MAIN_FIELDS=[style,main]`.

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
    value::UncasedStr,
};
use fob_stylus::StylusOptions;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::ResolveArgs;
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "fob-stylus.json";
pub const ENV_PREFIX: &str = "FOB_STYLUS_";

/// Values set on the command line. Unset fields leave lower layers alone;
/// list fields are appended to what the lower layers provide.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpack_importer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_css: Option<bool>,
    /// `false` turns `url()` rewriting off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_url: Option<bool>,
}

impl From<&ResolveArgs> for CliOverrides {
    fn from(args: &ResolveArgs) -> Self {
        Self {
            include: args.include.clone(),
            import: args.import.clone(),
            root: args.root.clone(),
            ..Default::default()
        }
    }
}

/// Load options for a run started in `cwd`.
///
/// An explicit `config_path` must exist; the default `fob-stylus.json` is
/// optional.
pub fn load(
    cwd: &Path,
    config_path: Option<&Path>,
    overrides: CliOverrides,
) -> Result<StylusOptions, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(StylusOptions::default()));

    match config_path {
        Some(path) => {
            let path = cwd.join(path);
            if !path.is_file() {
                return Err(ConfigError::NotFound(path));
            }
            figment = figment.merge(Json::file(path));
        }
        None => {
            let default_path = cwd.join(CONFIG_FILE);
            if default_path.is_file() {
                figment = figment.merge(Json::file(default_path));
            }
        }
    }

    figment = figment
        .merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .map(|key| camel_case(key).into()),
        )
        .admerge(Serialized::defaults(overrides));

    Ok(figment.extract()?)
}

/// `include_css` to `includeCss`, keeping `.` separated segments apart.
fn camel_case(key: &UncasedStr) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.as_str().chars() {
        match c {
            '_' => upper = true,
            '.' => {
                upper = false;
                out.push(c);
            }
            c if upper => {
                out.push(c.to_ascii_uppercase());
                upper = false;
            }
            c => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case(UncasedStr::new("include_css")), "includeCss");
        assert_eq!(
            camel_case(UncasedStr::new("resolve.main_fields")),
            "resolve.mainFields"
        );
        assert_eq!(camel_case(UncasedStr::new("ROOT")), "root");
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let options = load(dir.path(), None, CliOverrides::default()).unwrap();
        assert_eq!(options, StylusOptions::default());
    }

    #[test]
    fn test_file_then_cli_layers() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "paths": ["vendor"], "include": ["shared"], "includeCss": true,
                 "resolve": { "alias": { "@theme": "./theme" } } }"#,
        )
        .unwrap();

        let options = load(
            dir.path(),
            None,
            CliOverrides {
                include: vec![PathBuf::from("extra")],
                webpack_importer: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(options.paths, vec![PathBuf::from("vendor")]);
        assert_eq!(
            options.include,
            vec![PathBuf::from("shared"), PathBuf::from("extra")]
        );
        assert!(options.include_css);
        assert!(!options.webpack_importer);
        assert_eq!(options.resolve.alias.get("@theme").map(String::as_str), Some("./theme"));
        assert_eq!(options.resolve.extensions, vec![".styl", ".css"]);
    }

    #[test]
    fn test_resolve_url_layers() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "resolveUrl": { "nocheck": true } }"#,
        )
        .unwrap();

        let from_file = load(dir.path(), None, CliOverrides::default()).unwrap();
        assert!(from_file.resolve_url.enabled);
        assert!(from_file.resolve_url.nocheck);

        let disabled = load(
            dir.path(),
            None,
            CliOverrides {
                resolve_url: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!disabled.resolve_url.enabled);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path(), Some(Path::new("nope.json")), CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{ "paths": 3 }"#).unwrap();
        let err = load(dir.path(), None, CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
