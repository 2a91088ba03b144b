//! fob-stylus CLI.
//!
//! - [`cli`] - argument definitions
//! - [`commands`] - `deps` and `render`
//! - [`config`] - layered options (defaults, `fob-stylus.json`, environment, flags)
//! - [`error`] - error types and miette conversion
//! - [`logger`] - tracing setup

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;

pub use error::{CliError, ConfigError, Result};
