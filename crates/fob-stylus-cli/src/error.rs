//! CLI error types and their conversion to miette reports.

use fob_stylus::{LoaderError, RenderError};
use miette::Report;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The walk finished but reported error-severity diagnostics.
    #[error("{count} stylesheet(s) failed to parse")]
    Diagnostics { count: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}\n\nHint: Create a fob-stylus.json file or drop --config", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {message}\n\nHint: Check fob-stylus.json syntax and FOB_STYLUS_* variables")]
    Invalid { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Invalid {
            message: err.to_string(),
        }
    }
}

/// Convert a CLI error into a miette report with a hint where one helps.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Loader(LoaderError::Render(render)) => render_error_to_miette(render),
        CliError::Loader(LoaderError::ReadEntry { path, source }) => miette::miette!(
            "Failed to read entry stylesheet {}: {}\n\nHint: Paths are relative to the current directory",
            path.display(),
            source
        ),
        _ => miette::miette!("{}", err),
    }
}

fn render_error_to_miette(err: RenderError) -> Report {
    match &err {
        RenderError::ImportNotFound { specifier, .. } if specifier.starts_with('~') => {
            miette::miette!(
                "{}\n\nHint: '~' requests go through node_modules; check the package is installed",
                err
            )
        }
        RenderError::ImportNotFound { .. } => miette::miette!(
            "{}\n\nHint: Add the containing directory with --include or the `paths` option",
            err
        ),
        RenderError::ImportLoop { .. } => miette::miette!(
            "{}\n\nHint: Use @require for files that may be reached more than once",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}
