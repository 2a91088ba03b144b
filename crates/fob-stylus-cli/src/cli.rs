//! Command-line interface definition.
//!
//! - `fob-stylus deps` - walk an entry stylesheet and print its resolved imports
//! - `fob-stylus render` - inline every import and print the flattened stylesheet

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bundler-aware import resolution for Stylus stylesheets
#[derive(Parser, Debug)]
#[command(
    name = "fob-stylus",
    version,
    about = "Bundler-aware import resolution for Stylus stylesheets",
    long_about = "Resolves @import and @require in Stylus stylesheets the way a bundler would:\n\
                  search paths and index files first, then aliases, node_modules and package\n\
                  fields. Glob imports are expanded against their resolved base directory."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a JSON config file (defaults to ./fob-stylus.json when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the import graph of an entry stylesheet
    Deps(DepsArgs),

    /// Render an entry stylesheet with every import inlined
    Render(RenderArgs),
}

/// Options shared by every command that resolves imports.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Additional search directory for native lookup (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Root for `/`-prefixed imports and for reported source paths
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Specifier imported before the entry's own content (repeatable)
    #[arg(long = "import", value_name = "SPECIFIER")]
    pub import: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DepsArgs {
    /// Entry stylesheet
    pub entry: PathBuf,

    /// Print the full walk result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub resolve: ResolveArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Entry stylesheet
    pub entry: PathBuf,

    /// Write the rendered stylesheet here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip the bundler pre-pass and use native lookup only
    #[arg(long)]
    pub no_bundler_resolver: bool,

    /// Inline `.css` imports instead of leaving them literal
    #[arg(long)]
    pub include_css: bool,

    /// Leave `url()` references in imported files as written
    #[arg(long)]
    pub no_resolve_url: bool,

    #[command(flatten)]
    pub resolve: ResolveArgs,
}
