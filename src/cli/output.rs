//! Output formatting for CLI commands.
//!
//! Text output is meant for people reading a terminal; JSON output mirrors
//! the library types so it can be piped into other tools.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::{ResearchRun, ResearchLog};
use crate::core::dedup_by_locator;
use crate::error::{CommandError, Result};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for anything unknown.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if serialization fails.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(|e| {
            CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
        })
    }
}

/// Formats a finished run as text.
///
/// The report comes first, then the de-duplicated sources, then a stats
/// footer. With `show_log` the research log is appended.
#[must_use]
pub fn format_run(run: &ResearchRun, show_log: bool) -> String {
    let mut output = run.result.report.trim_end().to_string();

    let sources = dedup_by_locator(&run.result.sources);
    if !sources.is_empty() {
        output.push_str("\n\nSources:");
        for (i, source) in sources.iter().enumerate() {
            let _ = write!(output, "\n  {}. {}", i + 1, source.locator);
        }
    }

    let _ = write!(
        output,
        "\n\n---\nIterations: {} | Sub-tasks: {} ({} failed) | Sources: {} | Tokens: {} | Time: {:.1}s",
        run.iterations,
        run.tasks_dispatched,
        run.tasks_failed,
        sources.len(),
        run.total_tokens,
        run.elapsed.as_secs_f64()
    );

    if show_log {
        output.push_str("\n\n");
        output.push_str(&format_log(&run.log));
    }

    output.push('\n');
    output
}

/// Formats the research log, one line per entry.
#[must_use]
pub fn format_log(log: &ResearchLog) -> String {
    let mut output = String::from("Research log:");
    for entry in log.entries() {
        let marker = if entry.degraded { " (fallback)" } else { "" };
        let _ = write!(
            output,
            "\n  [{}] #{} {:?}: {}{marker}",
            entry.phase, entry.iteration, entry.actor, entry.summary
        );
    }
    output
}

/// Formats batch outcomes as text, one section per query.
#[must_use]
pub fn format_batch(queries: &[String], runs: &[Result<ResearchRun>]) -> String {
    let mut output = String::new();
    for (i, (query, run)) in queries.iter().zip(runs).enumerate() {
        if i > 0 {
            output.push('\n');
        }
        let _ = writeln!(output, "=== [{}/{}] {} ===", i + 1, queries.len(), query.trim());
        match run {
            Ok(run) => output.push_str(&format_run(run, false)),
            Err(e) => {
                let _ = writeln!(output, "Error: {e}");
            }
        }
    }
    output
}
