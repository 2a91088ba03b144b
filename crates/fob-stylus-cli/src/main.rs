//! fob-stylus entry point: parse arguments, set up logging, dispatch.

use clap::Parser;
use fob_stylus_cli::{cli, commands, error, logger};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let config = args.config.as_deref();
    let result = match args.command {
        cli::Command::Deps(deps_args) => commands::deps_execute(deps_args, config).await,
        cli::Command::Render(render_args) => commands::render_execute(render_args, config).await,
    };

    result.map_err(error::cli_error_to_miette)
}
