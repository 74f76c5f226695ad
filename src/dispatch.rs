use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::store::StoreError;

/// Why a dispatched operation produced no payload.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Outcome of one submitted operation. `index` is its submission position.
#[derive(Debug)]
pub struct Completed<T> {
    pub index: usize,
    pub result: Result<T, TaskFailure>,
}

impl<T> Completed<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bounded worker pool for independent network calls.
///
/// Every submitted operation yields exactly one `Completed`, in completion
/// order. A failing or panicking operation never cancels its siblings.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    max_workers: usize,
}

impl Dispatcher {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub async fn run_concurrently<T, F>(
        &self,
        operations: impl IntoIterator<Item = F>,
    ) -> Vec<Completed<T>>
    where
        F: Future<Output = Result<T, StoreError>> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for (index, operation) in operations.into_iter().enumerate() {
            let permits = permits.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only fails if it is dropped.
                let _permit = permits.acquire_owned().await.ok();
                let result = match tokio::spawn(operation).await {
                    Ok(result) => result.map_err(TaskFailure::from),
                    Err(join_err) => Err(TaskFailure::Aborted(join_err.to_string())),
                };
                Completed { index, result }
            });
        }

        let mut completed = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    if let Err(err) = &outcome.result {
                        warn!(index = outcome.index, error = %err, "operation failed");
                    }
                    completed.push(outcome);
                }
                Err(join_err) => error!("dispatcher task lost: {join_err}"),
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_max_workers() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let operations = (0..40).map(|idx| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, StoreError>(idx)
            }
        });

        let results = Dispatcher::new(3).run_concurrently(operations).await;
        assert_eq!(results.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(results.iter().all(Completed::is_success));
    }

    #[tokio::test]
    async fn failures_and_panics_become_outcomes() {
        let operations = (0..10usize).map(|idx| async move {
            match idx {
                3 => Err(StoreError::RateLimited("busy".into())),
                7 => panic!("boom"),
                _ => Ok(idx),
            }
        });

        let results = Dispatcher::new(4).run_concurrently(operations).await;
        assert_eq!(results.len(), 10);

        let mut indices: Vec<_> = results.iter().map(|c| c.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());

        for outcome in &results {
            match outcome.index {
                3 => assert!(matches!(
                    outcome.result,
                    Err(TaskFailure::Store(StoreError::RateLimited(_)))
                )),
                7 => assert!(matches!(outcome.result, Err(TaskFailure::Aborted(_)))),
                idx => assert_eq!(outcome.result.as_ref().ok(), Some(&idx)),
            }
        }
    }

    #[tokio::test]
    async fn results_arrive_in_completion_order() {
        let operations = [30u64, 1].into_iter().map(|delay| async move {
            sleep(Duration::from_millis(delay)).await;
            Ok::<_, StoreError>(delay)
        });

        let results = Dispatcher::new(2).run_concurrently(operations).await;
        let order: Vec<_> = results.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[tokio::test]
    async fn zero_workers_is_clamped() {
        let dispatcher = Dispatcher::new(0);
        assert_eq!(dispatcher.max_workers(), 1);
        let results = dispatcher
            .run_concurrently((0..3).map(|i| async move { Ok::<_, StoreError>(i) }))
            .await;
        assert_eq!(results.len(), 3);
    }
}
