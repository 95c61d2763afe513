//! Bounded concurrent dispatch of sub-tasks.
//!
//! [`dispatch`] runs every task of a batch through a [`TaskRunner`] with at
//! most `max_workers` in flight, and waits for all of them. Results come
//! back in completion order. A task whose runner panics or is aborted still
//! yields a failed [`SubTaskResult`], so N tasks always give N results.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::finding::SubTaskResult;
use super::message::TokenUsage;

/// Executes a single sub-task.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Runs `task` to a result. Implementations capture their own failures.
    async fn run(&self, task: &str) -> SubTaskResult;
}

/// Runs all `tasks` with bounded concurrency and returns one result per task.
///
/// `request_delay` is slept after acquiring a worker slot, before the task
/// starts.
pub async fn dispatch(
    runner: &Arc<dyn TaskRunner>,
    tasks: &[String],
    max_workers: usize,
    request_delay: Duration,
) -> Vec<SubTaskResult> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for (index, task) in tasks.iter().enumerate() {
        let runner = Arc::clone(runner);
        let semaphore = Arc::clone(&semaphore);
        let task = task.clone();

        set.spawn(async move {
            // The semaphore is never closed; a failed acquire just runs unbounded.
            let _permit = semaphore.acquire_owned().await.ok();

            if !request_delay.is_zero() {
                tokio::time::sleep(request_delay).await;
            }

            let result = AssertUnwindSafe(runner.run(&task))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(task, panic = message, "worker panicked");
                    SubTaskResult::failed(
                        task.as_str(),
                        format!("worker panicked: {message}"),
                        TokenUsage::default(),
                    )
                });
            (index, result)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    let mut finished = vec![false; tasks.len()];

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Some(slot) = finished.get_mut(index) {
                    *slot = true;
                }
                debug!(task = result.task, failed = result.is_failure(), "sub-task finished");
                results.push(result);
            }
            Err(e) => warn!(error = %e, "worker task did not complete"),
        }
    }

    for (task, _) in tasks.iter().zip(&finished).filter(|(_, done)| !**done) {
        results.push(SubTaskResult::failed(
            task.as_str(),
            "worker task aborted",
            TokenUsage::default(),
        ));
    }

    results
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use crate::agent::finding::Source;

    /// Runner that fails tasks starting with "fail", panics on "panic", and
    /// tracks peak concurrency.
    #[derive(Default)]
    struct ProbeRunner {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TaskRunner for ProbeRunner {
        async fn run(&self, task: &str) -> SubTaskResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if task.starts_with("panic") {
                panic!("boom in {task}");
            }
            if task.starts_with("fail") {
                return SubTaskResult::failed(task, "network down", TokenUsage::default());
            }
            SubTaskResult::succeeded(
                task,
                format!("findings for {task}"),
                vec![Source::new(format!("https://{task}.example"), "")],
                TokenUsage::default(),
            )
        }
    }

    fn tasks(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_dispatch_one_result_per_task() {
        let runner: Arc<dyn TaskRunner> = Arc::new(ProbeRunner::default());
        let input = tasks(&["a", "fail-b", "c", "panic-d", "e"]);

        let results = dispatch(&runner, &input, 2, Duration::ZERO).await;

        assert_eq!(results.len(), input.len());
        let mut seen: Vec<&str> = results.iter().map(|r| r.task.as_str()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "c", "e", "fail-b", "panic-d"]);

        let failed: Vec<_> = results.iter().filter(|r| r.is_failure()).collect();
        assert_eq!(failed.len(), 2);
        let panicked = results
            .iter()
            .find(|r| r.task == "panic-d")
            .unwrap_or_else(|| panic!("missing panic-d"));
        assert!(
            panicked
                .error
                .as_deref()
                .is_some_and(|e| e.contains("boom in panic-d"))
        );
    }

    #[tokio::test]
    async fn test_dispatch_respects_worker_bound() {
        let probe = Arc::new(ProbeRunner::default());
        let runner: Arc<dyn TaskRunner> = probe.clone();
        let input: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();

        let results = dispatch(&runner, &input, 3, Duration::ZERO).await;

        assert_eq!(results.len(), 12);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_dispatch_empty_batch() {
        let runner: Arc<dyn TaskRunner> = Arc::new(ProbeRunner::default());
        assert!(dispatch(&runner, &[], 4, Duration::ZERO).await.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_dispatch_count_matches(
            names in prop::collection::vec("(fail|panic|ok)-[a-z]{1,4}", 0..10),
            workers in 1usize..5,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap_or_else(|e| panic!("runtime: {e}"));
            let runner: Arc<dyn TaskRunner> = Arc::new(ProbeRunner::default());
            let results = runtime.block_on(dispatch(&runner, &names, workers, Duration::ZERO));
            prop_assert_eq!(results.len(), names.len());
        }
    }
}
