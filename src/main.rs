//! research-rs CLI entry point.

use clap::Parser;
use research_rs::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = execute(&cli)?;
    if !output.is_empty() {
        #[allow(clippy::print_stdout)]
        {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
