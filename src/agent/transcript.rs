//! Ordered audit record of a research run.

use serde::Serialize;

use super::finding::SubTaskResult;

/// Phase of the research loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Decomposing the query.
    Planning,
    /// Fanning out sub-tasks and synthesizing.
    Iterating,
    /// Adding citations.
    Citing,
    /// Run finished.
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Iterating => "iterating",
            Self::Citing => "citing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The person asking the question.
    User,
    /// The planner agent.
    Planner,
    /// A research worker.
    Worker,
    /// The synthesizer agent.
    Synthesizer,
    /// The citation agent.
    Citation,
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Phase the entry was written in.
    pub phase: Phase,
    /// Producer of the entry.
    pub actor: Actor,
    /// Iteration index (0 during planning).
    pub iteration: usize,
    /// Short description of the step.
    pub summary: String,
    /// Text produced by the step.
    pub content: String,
    /// Whether the step failed or fell back.
    pub degraded: bool,
}

/// Append-only record of every agent step in a run.
///
/// Every sub-task result is logged exactly once, failures included.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResearchLog {
    entries: Vec<LogEntry>,
}

impl ResearchLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(
        &mut self,
        phase: Phase,
        actor: Actor,
        iteration: usize,
        summary: impl Into<String>,
        content: impl Into<String>,
        degraded: bool,
    ) {
        self.entries.push(LogEntry {
            phase,
            actor,
            iteration,
            summary: summary.into(),
            content: content.into(),
            degraded,
        });
    }

    /// Appends one entry per sub-task result.
    pub fn record_results(&mut self, iteration: usize, results: &[SubTaskResult]) {
        for result in results {
            let content = match &result.error {
                Some(error) => format!("Error: {error}"),
                None => result.findings.clone(),
            };
            self.record(
                Phase::Iterating,
                Actor::Worker,
                iteration,
                result.task.clone(),
                content,
                result.is_failure(),
            );
        }
    }

    /// Returns all entries in order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been logged.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries written by `actor`.
    pub fn by_actor(&self, actor: Actor) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.actor == actor)
    }
}
