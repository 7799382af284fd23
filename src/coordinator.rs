use crate::fetcher::RetryingFetcher;
use crate::model::{FetchError, PageSnapshot, RetryPolicy};

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::info;

/// Fans a batch of URLs out over the pool. Concurrency never exceeds pool
/// capacity: extra workers would only queue inside `acquire`.
pub struct ParallelFetchCoordinator {
    fetcher: Arc<RetryingFetcher>,
    concurrency: usize,
}

impl ParallelFetchCoordinator {
    pub fn new(fetcher: Arc<RetryingFetcher>, pool_capacity: usize) -> Self {
        Self {
            fetcher,
            concurrency: pool_capacity.max(1),
        }
    }

    /// Fetches every URL with bounded concurrency and returns one result per
    /// URL, aligned by index with the input no matter which task finished
    /// first. A URL that exhausts its retries fills its own slot with an
    /// error and never aborts its siblings.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Result<PageSnapshot, FetchError>> {
        self.dispatch(urls, None).await
    }

    /// Same as `fetch_all` with a caller-supplied retry policy for this batch.
    pub async fn fetch_all_with(
        &self,
        urls: &[String],
        policy: RetryPolicy,
    ) -> Vec<Result<PageSnapshot, FetchError>> {
        self.dispatch(urls, Some(policy)).await
    }

    async fn dispatch(
        &self,
        urls: &[String],
        policy: Option<RetryPolicy>,
    ) -> Vec<Result<PageSnapshot, FetchError>> {
        if urls.is_empty() {
            return Vec::new();
        }
        let limit = self.concurrency.min(urls.len());
        info!("fetching {} URLs, {} at a time", urls.len(), limit);

        let mut slots: Vec<Option<Result<PageSnapshot, FetchError>>> =
            (0..urls.len()).map(|_| None).collect();

        let mut completions = stream::iter(urls.iter().cloned().enumerate())
            .map(|(index, url)| {
                let fetcher = self.fetcher.clone();
                let policy = policy.clone();
                async move {
                    let result = match &policy {
                        Some(policy) => fetcher.fetch_with(&url, policy).await,
                        None => fetcher.fetch(&url).await,
                    };
                    (index, result)
                }
            })
            .buffer_unordered(limit);

        while let Some((index, result)) = completions.next().await {
            slots[index] = Some(result);
        }

        // Every task completed exactly once, so every slot is filled.
        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SessionPool;
    use crate::session::testing::{MockFactory, MockState};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    async fn coordinator_with(
        capacity: usize,
    ) -> (ParallelFetchCoordinator, Arc<MockState>) {
        let factory = MockFactory::new();
        let state = factory.state.clone();
        let pool = Arc::new(
            SessionPool::open(Arc::new(factory), capacity, None)
                .await
                .unwrap(),
        );
        let policy = RetryPolicy {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_millis(500),
            backoff: Duration::from_millis(5),
        };
        let fetcher = Arc::new(RetryingFetcher::new(pool.clone(), policy));
        (
            ParallelFetchCoordinator::new(fetcher, pool.capacity()),
            state,
        )
    }

    fn urls(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn results_line_up_with_input_under_reordered_completions() {
        let (coordinator, state) = coordinator_with(3).await;
        // u1 slowest, u3 fastest: completion order is the reverse of input.
        state.latency_for("http://u1", Duration::from_millis(80));
        state.latency_for("http://u2", Duration::from_millis(40));
        state.latency_for("http://u3", Duration::from_millis(1));

        let batch = urls(&["http://u1", "http://u2", "http://u3"]);
        let results = coordinator.fetch_all(&batch).await;

        assert_eq!(results.len(), 3);
        for (url, result) in batch.iter().zip(&results) {
            let snapshot = result.as_ref().unwrap();
            assert_eq!(&snapshot.url, url);
        }
    }

    #[tokio::test]
    async fn one_exhausted_url_does_not_abort_siblings() {
        let (coordinator, state) = coordinator_with(2).await;
        state.fail_first_for("http://dead", u32::MAX);

        let batch = urls(&["http://a", "http://dead", "http://b"]);
        let results = coordinator.fetch_all(&batch).await;

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(FetchError::Exhausted { ref url, .. }) if url == "http://dead"
        ));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_pool_capacity() {
        let (coordinator, state) = coordinator_with(2).await;
        let batch: Vec<String> = (0..8).map(|n| format!("http://u{n}")).collect();
        for url in &batch {
            state.latency_for(url, Duration::from_millis(15));
        }

        let results = coordinator.fetch_all(&batch).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(state.max_active.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn batch_policy_applies_to_every_task() {
        let (coordinator, state) = coordinator_with(2).await;
        state.fail_first_for("http://flaky", 1);

        let single_shot = RetryPolicy {
            max_attempts: 1,
            per_attempt_timeout: Duration::from_millis(500),
            backoff: Duration::from_millis(5),
        };
        let batch = urls(&["http://flaky", "http://fine"]);
        let results = coordinator.fetch_all_with(&batch, single_shot).await;

        assert!(matches!(
            results[0],
            Err(FetchError::Exhausted { attempts: 1, .. })
        ));
        assert!(results[1].is_ok());
        assert_eq!(state.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let (coordinator, state) = coordinator_with(2).await;
        let results = coordinator.fetch_all(&[]).await;
        assert!(results.is_empty());
        assert_eq!(state.attempts.load(Ordering::SeqCst), 0);
    }
}
