//! CLI command implementations.
//!
//! Each command builds its configuration, runs the pipeline on a tokio
//! runtime, and returns the formatted output for `main` to print.

use std::path::Path;

use tracing::debug;

use crate::agent::{
    Orchestrator, PromptSet, ResearchConfig, ResearchRun, create_provider, create_search_backend,
};
use crate::cli::output::{OutputFormat, format_batch, format_run};
use crate::cli::parser::{Cli, Commands, RunOverrides};
use crate::error::{CommandError, Result};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, a query is rejected,
/// or output cannot be produced.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Run {
            query,
            overrides,
            show_log,
        } => cmd_run(query, overrides, *show_log, format),
        Commands::Batch {
            queries,
            file,
            overrides,
        } => cmd_batch(queries, file.as_deref(), overrides, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds the research configuration: CLI overrides first, then the
/// environment, then defaults.
fn build_config(overrides: &RunOverrides) -> Result<ResearchConfig> {
    let mut builder = ResearchConfig::builder();
    if let Some(n) = overrides.max_iterations {
        builder = builder.max_iterations(n);
    }
    if let Some(n) = overrides.max_workers {
        builder = builder.max_workers(n);
    }
    if let Some(ref model) = overrides.director_model {
        builder = builder.director_model(model);
    }
    if let Some(ref model) = overrides.worker_model {
        builder = builder.worker_model(model);
    }
    if let Some(ref dir) = overrides.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Research configuration error: {e}")).into()
    })
}

fn build_orchestrator(overrides: &RunOverrides) -> Result<Orchestrator> {
    let config = build_config(overrides)?;
    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let search = create_search_backend(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Search backend creation failed: {e}"))
    })?;
    debug!(
        provider = provider.name(),
        search = search.name(),
        "backends ready"
    );
    Ok(Orchestrator::new(provider, search, config))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn cmd_run(
    query: &str,
    overrides: &RunOverrides,
    show_log: bool,
    format: OutputFormat,
) -> Result<String> {
    let orchestrator = build_orchestrator(overrides)?;
    let rt = runtime()?;

    let run = rt
        .block_on(orchestrator.run_detailed(query))
        .map_err(|e| CommandError::ExecutionFailed(format!("Research failed: {e}")))?;

    match format {
        OutputFormat::Text => Ok(format_run(&run, show_log)),
        OutputFormat::Json => format.to_json(&run),
    }
}

fn cmd_batch(
    queries: &[String],
    file: Option<&Path>,
    overrides: &RunOverrides,
    format: OutputFormat,
) -> Result<String> {
    let mut all = queries.to_vec();
    if let Some(path) = file {
        all.extend(read_queries(path)?);
    }
    if all.is_empty() {
        return Err(CommandError::InvalidArgument(
            "no queries given; pass them as arguments or with --file".to_string(),
        )
        .into());
    }

    let orchestrator = build_orchestrator(overrides)?;
    let rt = runtime()?;

    let runs: Vec<Result<ResearchRun>> = rt
        .block_on(orchestrator.run_many_detailed(&all))
        .into_iter()
        .map(|r| r.map_err(Into::into))
        .collect();

    match format {
        OutputFormat::Text => Ok(format_batch(&all, &runs)),
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = all
                .iter()
                .zip(&runs)
                .map(|(query, run)| match run {
                    Ok(run) => serde_json::json!({ "query": query, "run": run }),
                    Err(e) => serde_json::json!({ "query": query, "error": e.to_string() }),
                })
                .collect();
            format.to_json(&items)
        }
    }
}

/// Reads one query per line, skipping blank lines and `#` comments.
fn read_queries(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CommandError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(parse_queries(&content))
}

fn parse_queries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Writes default prompt templates to disk for customization.
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");
                output.push_str("  ");
                output.push_str(name);
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            format.to_json(&json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_queries_skips_blank_and_comments() {
        let content = "# questions\nFirst question\n\n   \n  Second question  \n#skip\n";
        assert_eq!(
            parse_queries(content),
            vec!["First question".to_string(), "Second question".to_string()]
        );
    }

    #[test]
    fn test_read_queries_missing_file() {
        let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let result = read_queries(&temp_dir.path().join("absent.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_without_queries_is_rejected() {
        let result = cmd_batch(&[], None, &RunOverrides::default(), OutputFormat::Text);
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.starts_with("invalid argument: no queries given"));
    }

    #[test]
    fn test_init_prompts_writes_then_skips() {
        let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let dir = temp_dir.path().join("prompts");

        let first = cmd_init_prompts(Some(&dir), OutputFormat::Text).unwrap_or_default();
        assert!(first.starts_with("Wrote 4 prompt template(s)"));
        assert!(first.contains("planner.md"));
        assert!(dir.join("citation.md").exists());

        let second = cmd_init_prompts(Some(&dir), OutputFormat::Json).unwrap_or_default();
        let value: serde_json::Value =
            serde_json::from_str(&second).unwrap_or_else(|_| unreachable!());
        assert_eq!(value["count"], 0);
    }
}
