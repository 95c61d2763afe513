//! CLI layer for research-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! running single and batched research queries and for exporting the
//! default prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, RunOverrides};
