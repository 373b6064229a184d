//! Command-line interface for `azad`.
//!
//! Argument definitions and the text/JSON formatting of command results.

mod commands;
mod output;

pub use commands::{Cli, Commands, LookupCommands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
