//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// research-rs: multi-agent research from the command line.
///
/// Decomposes a question into sub-tasks, researches them with concurrent
/// search-backed workers, and iterates until a cited report converges.
#[derive(Parser, Debug)]
#[command(name = "research-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a single question and print the cited report.
    ///
    /// Requires `OPENAI_API_KEY` (or `RESEARCH_API_KEY`). Web search uses
    /// `EXA_API_KEY`; without it workers answer from the model alone.
    #[command(after_help = r#"Examples:
  research-rs run "What are the tradeoffs of io_uring?"
  research-rs run "Rust in the Linux kernel" --max-iterations 2
  research-rs run "CRDTs vs OT" --max-workers 2 --show-log
  research-rs --format json run "WebAssembly outside the browser" | jq '.result.report'
"#)]
    Run {
        /// The research question.
        query: String,

        /// Research loop overrides.
        #[command(flatten)]
        overrides: RunOverrides,

        /// Append the per-phase research log to the text output.
        #[arg(long)]
        show_log: bool,
    },

    /// Research several questions, one independent run each.
    ///
    /// Questions run in order. A question that fails validation is
    /// reported and the remaining questions still run.
    #[command(after_help = r#"Examples:
  research-rs batch "First question" "Second question"
  research-rs batch --file questions.txt        # One question per line
  research-rs --format json batch --file q.txt  # Array of runs
"#)]
    Batch {
        /// Research questions.
        queries: Vec<String>,

        /// Read additional questions from a file, one per line.
        ///
        /// Blank lines and lines starting with `#` are ignored.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Research loop overrides.
        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Write default prompt templates to disk for customization.
    ///
    /// Creates planner, worker, synthesizer and citation prompt files.
    /// Existing files are never overwritten.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  research-rs init-prompts                     # Write to ~/.config/research-rs/prompts/
  research-rs init-prompts --dir ./my-prompts  # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/research-rs/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Per-invocation overrides for the research configuration.
///
/// Unset options fall back to the environment, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Maximum synthesis iterations.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Maximum concurrently running workers.
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Model for the planner, synthesizer and citation agents.
    #[arg(long)]
    pub director_model: Option<String>,

    /// Model for research workers.
    #[arg(long)]
    pub worker_model: Option<String>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,
}
