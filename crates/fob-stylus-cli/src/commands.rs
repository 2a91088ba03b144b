//! Command implementations.

use fob_stylus::{Diagnostic, NativeRuntime, ResolvedTarget, Severity, StylusLoader, WalkOutput};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{DepsArgs, RenderArgs};
use crate::config::{self, CliOverrides};
use crate::error::{CliError, Result};

/// Walk the entry's import graph and print one line per import.
///
/// The walk covers `additionalData` and the `import` list, as a render would.
pub async fn deps_execute(args: DepsArgs, config_path: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let options = config::load(&cwd, config_path, CliOverrides::from(&args.resolve))?;

    let loader = StylusLoader::new(Arc::new(NativeRuntime::new()), options);
    let output = loader.walk_file(&args.entry).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_walk(&output));
    }
    report_diagnostics(&output.diagnostics);

    let errors = output
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Error)
        .count();
    if errors > 0 {
        return Err(CliError::Diagnostics { count: errors });
    }
    Ok(())
}

/// Render the entry with every import inlined.
pub async fn render_execute(args: RenderArgs, config_path: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let overrides = CliOverrides {
        webpack_importer: args.no_bundler_resolver.then_some(false),
        include_css: args.include_css.then_some(true),
        resolve_url: args.no_resolve_url.then_some(false),
        ..CliOverrides::from(&args.resolve)
    };
    let options = config::load(&cwd, config_path, overrides)?;

    let loader = StylusLoader::new(Arc::new(NativeRuntime::new()), options);
    let output = loader.compile_file(&args.entry).await?;
    report_diagnostics(&output.diagnostics);

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &output.code)
                .await
                .map_err(|source| CliError::Write {
                    path: path.clone(),
                    source,
                })?;
            info!(
                output = %path.display(),
                dependencies = output.file_dependencies.len(),
                "Wrote rendered stylesheet"
            );
        }
        None => print!("{}", output.code),
    }
    Ok(())
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Error => tracing::error!("{}", diagnostic),
        }
    }
}

/// Human-readable listing: each file, then its imports indented below it.
pub fn format_walk(output: &WalkOutput) -> String {
    let mut out = String::new();
    for (file, records) in output.index.iter() {
        let _ = writeln!(out, "{}", file.display());
        for record in records {
            let target = match &record.resolved {
                ResolvedTarget::Single(path) => path.display().to_string(),
                ResolvedTarget::Many(paths) => paths
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                ResolvedTarget::Failed(failure) => format!("unresolved ({})", failure.message),
            };
            let _ = writeln!(
                out,
                "  {} '{}' -> {}",
                record.position, record.specifier, target
            );
        }
    }
    out
}
