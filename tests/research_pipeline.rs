//! End-to-end tests of the research loop against scripted backends.

#![allow(clippy::panic)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{
    RecordingSearch, ScriptedProvider, Stage, TOKENS_PER_CALL, config, network_error,
    orchestrator, source_url, synthesis_json, worker_json,
};
use research_rs::agent::{Actor, Phase, ResearchRun};
use research_rs::error::AgentError;

async fn run(
    provider: ScriptedProvider,
    max_iterations: usize,
    query: &str,
) -> (ResearchRun, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let search = Arc::new(RecordingSearch::default());
    let orchestrator = orchestrator(&provider, &search, config(max_iterations, 4));
    let run = orchestrator
        .run_detailed(query)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));
    (run, provider)
}

#[tokio::test]
async fn test_happy_path_single_iteration() {
    let (run, provider) = run(ScriptedProvider::new(), 3, "Why is Rust popular?").await;

    assert_eq!(run.query, "Why is Rust popular?");
    assert_eq!(run.result.report, "Cited report");
    assert_eq!(run.iterations, 1);
    assert_eq!(run.tasks_dispatched, 3);
    assert_eq!(run.tasks_failed, 0);
    assert_eq!(run.result.sources.len(), 3);
    // planner + 3 workers + synthesizer + citation
    assert_eq!(provider.call_count(), 6);
    assert_eq!(run.total_tokens, 6 * TOKENS_PER_CALL);
}

#[tokio::test]
async fn test_planner_extraction_failure_uses_templated_tasks() {
    let provider =
        ScriptedProvider::new().planner(|_| Ok("Sorry, I cannot help with planning.".to_string()));
    let (run, provider) = run(provider, 3, "What are the benefits of X?").await;

    let tasks: Vec<String> = provider
        .calls(Stage::Worker)
        .iter()
        .map(common::Call::task)
        .collect();
    assert_eq!(tasks.len(), 3);
    for task in &tasks {
        assert!(task.ends_with("What benefits"), "unexpected task: {task}");
    }
    assert_eq!(run.tasks_failed, 0);
    assert_eq!(run.iterations, 1);
    assert_eq!(provider.calls(Stage::Synthesizer).len(), 1);

    let plan_entry = run
        .log
        .by_actor(Actor::Planner)
        .next()
        .unwrap_or_else(|| panic!("no plan entry"));
    assert!(plan_entry.degraded);
}

#[tokio::test]
async fn test_planner_backend_failure_without_terms_uses_query() {
    let provider = ScriptedProvider::new().planner(|_| Err(network_error()));
    let (run, provider) = run(provider, 3, "Is it ok?").await;

    let tasks: Vec<String> = provider
        .calls(Stage::Worker)
        .iter()
        .map(common::Call::task)
        .collect();
    assert_eq!(tasks, vec!["Is it ok?".to_string()]);
    assert_eq!(run.tasks_dispatched, 1);
}

#[tokio::test]
async fn test_worker_backend_failure_is_labeled_for_synthesis() {
    let provider = ScriptedProvider::new().worker(|call| {
        let task = call.task();
        if task == "task two" {
            Err(network_error())
        } else {
            Ok(worker_json(&task))
        }
    });
    let (run, provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.tasks_dispatched, 3);
    assert_eq!(run.tasks_failed, 1);
    assert_eq!(run.result.sources.len(), 2);

    let synthesis = provider.calls(Stage::Synthesizer);
    assert!(
        synthesis[0]
            .user
            .contains("--- Sub-Task Failed: task two ---\nError: API request failed: connection refused")
    );
    assert!(
        synthesis[0]
            .user
            .contains("--- Result for Sub-Task: task one ---\nFindings: Findings for task one")
    );

    let failed = run
        .log
        .by_actor(Actor::Worker)
        .find(|e| e.summary == "task two")
        .unwrap_or_else(|| panic!("no log entry for failed task"));
    assert!(failed.degraded);
    assert_eq!(failed.content, "Error: API request failed: connection refused");
}

#[tokio::test]
async fn test_panicking_worker_becomes_failed_result() {
    let provider = ScriptedProvider::new().worker(|call| {
        let task = call.task();
        if task == "task three" {
            panic!("worker blew up");
        }
        Ok(worker_json(&task))
    });
    let (run, _provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.tasks_dispatched, 3);
    assert_eq!(run.tasks_failed, 1);
    let failed = run
        .log
        .by_actor(Actor::Worker)
        .find(|e| e.summary == "task three")
        .unwrap_or_else(|| panic!("no log entry for panicked task"));
    assert!(failed.content.contains("worker panicked"));
}

#[tokio::test]
async fn test_unparseable_worker_answer_fails_extraction() {
    let provider = ScriptedProvider::new().worker(|call| {
        if call.task() == "task one" {
            Ok("I looked around but will not answer in JSON.".to_string())
        } else {
            Ok(worker_json(&call.task()))
        }
    });
    let (run, provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.tasks_failed, 1);
    assert!(
        provider.calls(Stage::Synthesizer)[0]
            .user
            .contains("--- Sub-Task Failed: task one ---\nError: extraction failed")
    );
}

#[tokio::test]
async fn test_budget_of_one_stops_after_first_iteration() {
    let provider = ScriptedProvider::new().synthesizer(|call| {
        Ok(synthesis_json(
            &format!("Draft {}", call.index + 1),
            false,
            &["dig deeper"],
        ))
    });
    let (run, provider) = run(provider, 1, "Why is Rust popular?").await;

    assert_eq!(run.iterations, 1);
    assert_eq!(provider.calls(Stage::Synthesizer).len(), 1);
    assert_eq!(provider.calls(Stage::Worker).len(), 3);

    let citation = provider.calls(Stage::Citation);
    assert_eq!(citation.len(), 1);
    assert!(citation[0].user.contains("\"report\": \"Draft 1\""));
}

#[tokio::test]
async fn test_always_incomplete_synthesis_terminates() {
    let provider = ScriptedProvider::new().synthesizer(|call| {
        let task = format!("follow-up {}", call.index + 1);
        Ok(synthesis_json(
            &format!("Draft {}", call.index + 1),
            false,
            &[task.as_str()],
        ))
    });
    let (run, provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.iterations, 3);
    assert_eq!(provider.calls(Stage::Synthesizer).len(), 3);
    // 3 planned, then one follow-up in each of the next two iterations
    assert_eq!(run.tasks_dispatched, 5);
    let tasks: HashSet<String> = provider
        .calls(Stage::Worker)
        .iter()
        .map(common::Call::task)
        .collect();
    assert!(tasks.contains("follow-up 1"));
    assert!(tasks.contains("follow-up 2"));
    assert!(!tasks.contains("follow-up 3"));

    let synthesis = provider.calls(Stage::Synthesizer);
    assert!(synthesis[1].user.contains("<draft>\nDraft 1\n</draft>"));
    assert!(synthesis[2].user.contains("<draft>\nDraft 2\n</draft>"));
}

#[tokio::test]
async fn test_incomplete_without_new_tasks_stops() {
    let provider =
        ScriptedProvider::new().synthesizer(|_| Ok(synthesis_json("Partial draft", false, &[])));
    let (run, provider) = run(provider, 5, "Why is Rust popular?").await;

    assert_eq!(run.iterations, 1);
    assert_eq!(provider.calls(Stage::Synthesizer).len(), 1);
}

#[tokio::test]
async fn test_unparseable_synthesis_completes_with_mechanical_draft() {
    let provider = ScriptedProvider::new()
        .synthesizer(|_| Ok("We should keep researching, more tasks needed.".to_string()))
        .citation(|_| Err(network_error()));
    let (run, provider) = run(provider, 5, "Why is Rust popular?").await;

    assert_eq!(run.iterations, 1);
    assert_eq!(provider.calls(Stage::Synthesizer).len(), 1);
    assert!(
        run.result
            .report
            .starts_with("Research Summary for: Why is Rust popular?\n\n")
    );
    assert!(run.result.report.contains("Findings for task two"));
    assert!(run.result.report.contains("## References\n[1] "));

    let synthesis = run
        .log
        .by_actor(Actor::Synthesizer)
        .next()
        .unwrap_or_else(|| panic!("no synthesis entry"));
    assert!(synthesis.degraded);
}

#[tokio::test]
async fn test_citation_fallback_appends_numbered_references() {
    let provider = ScriptedProvider::new()
        .planner(|_| Ok(r#"{"sub_tasks": ["only task"]}"#.to_string()))
        .worker(|_| {
            Ok(serde_json::json!({
                "findings": "F",
                "sources": [
                    {"source": "u1", "content": "a"},
                    {"source": "u2", "content": "b"}
                ]
            })
            .to_string())
        })
        .synthesizer(|_| Ok(synthesis_json("Draft.", true, &[])))
        .citation(|_| Ok("Here is your cited report, hope it helps!".to_string()));
    let (run, _provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.result.report, "Draft.\n\n## References\n[1] u1\n[2] u2\n");
    assert_eq!(run.result.sources.len(), 2);
    let citation = run
        .log
        .by_actor(Actor::Citation)
        .next()
        .unwrap_or_else(|| panic!("no citation entry"));
    assert!(citation.degraded);
    assert_eq!(citation.phase, Phase::Citing);
}

#[tokio::test]
async fn test_everything_failing_still_yields_a_report() {
    let provider = ScriptedProvider::new()
        .planner(|_| Err(network_error()))
        .worker(|_| Err(network_error()))
        .synthesizer(|_| Err(network_error()))
        .citation(|_| Err(network_error()));
    let (run, _provider) = run(provider, 3, "What are the benefits of X?").await;

    assert!(!run.result.report.is_empty());
    assert!(
        run.result
            .report
            .starts_with("Research was attempted for: What are the benefits of X?")
    );
    assert!(run.result.sources.is_empty());
    assert_eq!(run.tasks_failed, run.tasks_dispatched);
    assert_eq!(run.total_tokens, 0);
}

#[tokio::test]
async fn test_sources_accumulate_across_iterations_in_order() {
    let provider = ScriptedProvider::new().synthesizer(|call| {
        if call.index == 0 {
            Ok(synthesis_json("Draft 1", false, &["round two a", "round two b"]))
        } else {
            Ok(synthesis_json("Draft 2", true, &[]))
        }
    });
    let (run, _provider) = run(provider, 3, "Why is Rust popular?").await;

    assert_eq!(run.iterations, 2);
    let locators: Vec<&str> = run
        .result
        .sources
        .iter()
        .map(|s| s.locator.as_str())
        .collect();
    assert_eq!(locators.len(), 5);

    let first_round: HashSet<String> = ["task one", "task two", "task three"]
        .iter()
        .map(|t| source_url(t))
        .collect();
    let second_round: HashSet<String> = ["round two a", "round two b"]
        .iter()
        .map(|t| source_url(t))
        .collect();
    assert!(locators[..3].iter().all(|l| first_round.contains(*l)));
    assert!(locators[3..].iter().all(|l| second_round.contains(*l)));
}

#[tokio::test]
async fn test_every_task_yields_exactly_one_result() {
    let provider = ScriptedProvider::new()
        .planner(|_| {
            Ok(r#"{"sub_tasks": ["t1", "t2", "t3", "t4", "t5", "t6", "t7"]}"#.to_string())
        })
        .worker(|call| {
            let task = call.task();
            match task.as_str() {
                "t2" => Err(network_error()),
                "t5" => Ok("garbage".to_string()),
                _ => Ok(worker_json(&task)),
            }
        });
    let provider = Arc::new(provider);
    let search = Arc::new(RecordingSearch::default());
    let orchestrator = orchestrator(&provider, &search, config(3, 2));
    let run = orchestrator
        .run_detailed("Why is Rust popular?")
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(run.tasks_dispatched, 7);
    assert_eq!(run.tasks_failed, 2);
    let mut logged: Vec<String> = run
        .log
        .by_actor(Actor::Worker)
        .map(|e| e.summary.clone())
        .collect();
    logged.sort();
    assert_eq!(logged, vec!["t1", "t2", "t3", "t4", "t5", "t6", "t7"]);
}

#[tokio::test]
async fn test_log_records_each_phase() {
    let (run, _provider) = run(ScriptedProvider::new(), 3, "  Why is Rust popular?  ").await;

    let entries = run.log.entries();
    assert_eq!(entries[0].actor, Actor::User);
    assert_eq!(entries[0].content, "Why is Rust popular?");
    assert_eq!(entries[1].actor, Actor::Planner);
    assert_eq!(entries[1].content, "task one\ntask two\ntask three");
    assert_eq!(run.log.by_actor(Actor::Worker).count(), run.tasks_dispatched);
    assert_eq!(run.log.by_actor(Actor::Synthesizer).count(), run.iterations);
    assert_eq!(entries.last().map(|e| e.actor), Some(Actor::Citation));
    assert_eq!(run.log.len(), 1 + 1 + 3 + 1 + 1);
}

#[tokio::test]
async fn test_workers_search_with_their_task() {
    let provider = Arc::new(ScriptedProvider::new().searching().worker(|call| {
        let evidence = call.tool_output.clone().unwrap_or_default();
        Ok(serde_json::json!({
            "findings": evidence,
            "sources": [{"source": "https://search.example/1", "content": "x"}]
        })
        .to_string())
    }));
    let search = Arc::new(RecordingSearch::default());
    let orchestrator = orchestrator(&provider, &search, config(3, 4));
    let run = orchestrator
        .run_detailed("Why is Rust popular?")
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    let mut queries = search.queries();
    queries.sort();
    assert_eq!(queries, vec!["task one", "task three", "task two"]);
    assert!(
        provider.calls(Stage::Synthesizer)[0]
            .user
            .contains("Findings: 1. Title: About task one")
    );
    // each worker makes a tool round and a final round
    assert_eq!(run.total_tokens, (1 + 3 * 2 + 1 + 1) * TOKENS_PER_CALL);
}

#[tokio::test]
async fn test_invalid_query_is_rejected_before_any_call() {
    let provider = Arc::new(ScriptedProvider::new());
    let search = Arc::new(RecordingSearch::default());
    let orchestrator = orchestrator(&provider, &search, config(3, 4));

    let result = orchestrator.run("   ").await;
    assert!(matches!(result, Err(AgentError::InvalidQuery { .. })));
    let result = orchestrator.run(&"q".repeat(10_001)).await;
    assert!(matches!(result, Err(AgentError::InvalidQuery { .. })));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_run_many_runs_are_independent() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .planner(|call| {
                let query = call.tagged("query");
                let task = format!("{query} background");
                Ok(serde_json::json!({ "sub_tasks": [task] }).to_string())
            })
            .synthesizer(|call| {
                let draft = format!("Draft for {}", call.tagged("query"));
                Ok(synthesis_json(&draft, true, &[]))
            })
            .citation(|_| Ok("not json".to_string())),
    );
    let search = Arc::new(RecordingSearch::default());
    let orchestrator = orchestrator(&provider, &search, config(3, 4));

    let queries = vec![
        "first question".to_string(),
        String::new(),
        "second question".to_string(),
    ];
    let results = orchestrator.run_many(&queries).await;

    assert_eq!(results.len(), 3);
    assert!(matches!(results[1], Err(AgentError::InvalidQuery { .. })));

    let first = results[0].as_ref().unwrap_or_else(|e| panic!("first: {e}"));
    let second = results[2].as_ref().unwrap_or_else(|e| panic!("second: {e}"));
    assert!(first.report.starts_with("Draft for first question"));
    assert!(second.report.starts_with("Draft for second question"));
    assert_eq!(first.sources.len(), 1);
    assert_eq!(second.sources.len(), 1);
    assert_eq!(second.sources[0].locator, source_url("second question background"));
}
