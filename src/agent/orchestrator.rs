//! Orchestrator for the iterative research loop.
//!
//! Coordinates the full pipeline: plan → {fan out workers → synthesize}* →
//! cite. The loop state lives in an [`IterationState`] owned by the
//! orchestrator; workers only ever hand back results.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::citation::CitationAgent;
use super::config::ResearchConfig;
use super::executor::ToolExecutor;
use super::fanout::{TaskRunner, dispatch};
use super::finding::{FinalResult, IterationState, ResearchRun};
use super::message::TokenUsage;
use super::planner::{PlanSource, PlannerAgent};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::synthesizer::SynthesizerAgent;
use super::transcript::{Actor, Phase, ResearchLog};
use super::worker::{BoundWorker, WorkerAgent};
use crate::error::AgentError;
use crate::search::SearchBackend;

/// Maximum query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Runs research queries end to end.
///
/// Each call to [`Orchestrator::run`] is an independent run with its own
/// state; one orchestrator can serve many queries.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchBackend>,
    config: ResearchConfig,
    prompts: PromptSet,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given backends and configuration.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`ResearchConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        config: ResearchConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, search, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub const fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        config: ResearchConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            provider,
            search,
            config,
            prompts,
        }
    }

    /// Returns the active configuration.
    pub const fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Researches `query` and returns the cited report with its sources.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] if the query is empty or longer
    /// than [`MAX_QUERY_LEN`]. Nothing that happens during the run is an
    /// error: failed sub-tasks and unusable responses degrade the report.
    pub async fn run(&self, query: &str) -> Result<FinalResult, AgentError> {
        self.run_detailed(query).await.map(|run| run.result)
    }

    /// Researches each query as an independent run, in order.
    pub async fn run_many(&self, queries: &[String]) -> Vec<Result<FinalResult, AgentError>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.run(query).await);
        }
        results
    }

    /// Like [`Orchestrator::run_many`], keeping each run's log and accounting.
    pub async fn run_many_detailed(
        &self,
        queries: &[String],
    ) -> Vec<Result<ResearchRun, AgentError>> {
        let mut runs = Vec::with_capacity(queries.len());
        for query in queries {
            runs.push(self.run_detailed(query).await);
        }
        runs
    }

    /// Researches `query`, returning the result with its log and accounting.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::run`].
    pub async fn run_detailed(&self, query: &str) -> Result<ResearchRun, AgentError> {
        let query = validate_query(query)?;
        let start = Instant::now();
        let mut log = ResearchLog::new();
        let mut usage = TokenUsage::default();

        // Planning
        info!(phase = %Phase::Planning, query, "research started");
        log.record(Phase::Planning, Actor::User, 0, "query", query, false);
        let planner = PlannerAgent::new(&self.config, self.prompts.planner.clone());
        let plan = planner.plan(self.provider.as_ref(), query).await;
        usage.accumulate(plan.usage);
        log.record(
            Phase::Planning,
            Actor::Planner,
            0,
            format!("{} sub-tasks planned", plan.tasks.len()),
            plan.tasks.join("\n"),
            plan.source != PlanSource::Model,
        );

        // Iterating
        let runner: Arc<dyn TaskRunner> = Arc::new(BoundWorker::new(
            WorkerAgent::new(&self.config, self.prompts.worker.clone()),
            Arc::clone(&self.provider),
            ToolExecutor::new(Arc::clone(&self.search), self.config.search_results),
        ));
        let synthesizer = SynthesizerAgent::new(&self.config, self.prompts.synthesizer.clone());
        let mut state = IterationState::new(plan.tasks);
        let mut tasks_dispatched = 0;
        let mut tasks_failed = 0;

        loop {
            let iteration = state.iteration_index + 1;
            info!(
                phase = %Phase::Iterating,
                iteration,
                max_iterations = self.config.max_iterations,
                tasks = state.current_tasks.len(),
                "dispatching sub-tasks"
            );

            let results = dispatch(
                &runner,
                &state.current_tasks,
                self.config.max_workers,
                self.config.request_delay,
            )
            .await;

            tasks_dispatched += results.len();
            tasks_failed += results.iter().filter(|r| r.is_failure()).count();
            for result in &results {
                usage.accumulate(result.usage);
            }
            log.record_results(iteration, &results);
            state.absorb_sources(&results);

            let (outcome, synthesis_usage) = synthesizer
                .synthesize(self.provider.as_ref(), query, &state.draft_report, &results)
                .await;
            usage.accumulate(synthesis_usage);
            log.record(
                Phase::Iterating,
                Actor::Synthesizer,
                iteration,
                format!(
                    "complete: {}, new tasks: {}",
                    outcome.is_complete,
                    outcome.new_tasks.len()
                ),
                outcome.draft_report.clone(),
                outcome.fallback,
            );
            state.apply(outcome);

            if !state.should_continue(self.config.max_iterations) {
                info!(
                    iteration,
                    reason = stop_reason(&state, self.config.max_iterations),
                    sources = state.accumulated_sources.len(),
                    "research loop finished"
                );
                break;
            }
        }

        // Citing
        info!(
            phase = %Phase::Citing,
            sources = state.accumulated_sources.len(),
            "adding citations"
        );
        let citation = CitationAgent::new(&self.config, self.prompts.citation.clone())
            .finalize(
                self.provider.as_ref(),
                &state.draft_report,
                &state.accumulated_sources,
            )
            .await;
        usage.accumulate(citation.usage);
        log.record(
            Phase::Citing,
            Actor::Citation,
            state.iteration_index,
            "final report",
            citation.result.report.clone(),
            citation.fallback,
        );

        let elapsed = start.elapsed();
        info!(
            phase = %Phase::Done,
            iterations = state.iteration_index,
            tasks_dispatched,
            tasks_failed,
            total_tokens = usage.total_tokens,
            elapsed_secs = elapsed.as_secs_f64(),
            "research finished"
        );

        Ok(ResearchRun {
            query: query.to_string(),
            result: citation.result,
            iterations: state.iteration_index,
            tasks_dispatched,
            tasks_failed,
            total_tokens: usage.total_tokens,
            elapsed,
            log,
        })
    }
}

/// Trims `query` and checks it is non-empty and within [`MAX_QUERY_LEN`].
fn validate_query(query: &str) -> Result<&str, AgentError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidQuery {
            message: "query cannot be empty".to_string(),
        });
    }
    if trimmed.len() > MAX_QUERY_LEN {
        return Err(AgentError::InvalidQuery {
            message: format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                trimmed.len()
            ),
        });
    }
    Ok(trimmed)
}

const fn stop_reason(state: &IterationState, max_iterations: usize) -> &'static str {
    if state.is_complete {
        "complete"
    } else if state.current_tasks.is_empty() {
        "no new tasks"
    } else if state.iteration_index >= max_iterations {
        "iteration budget spent"
    } else {
        "unknown"
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("search", &self.search.name())
            .field("director_model", &self.config.director_model)
            .field("worker_model", &self.config.worker_model)
            .field("max_iterations", &self.config.max_iterations)
            .field("max_workers", &self.config.max_workers)
            .finish_non_exhaustive()
    }
}
