use crate::config::EngineConfig;
use crate::coordinator::ParallelFetchCoordinator;
use crate::fetcher::RetryingFetcher;
use crate::model::{FetchError, PageSnapshot, PoolError, RetryPolicy};
use crate::pool::SessionPool;
use crate::session::SessionFactory;

use std::sync::Arc;
use tracing::info;

/// Owner of the pool and fetch plumbing. Explicitly constructed and
/// explicitly closed; there is no process-wide instance.
pub struct Engine {
    pool: Arc<SessionPool>,
    fetcher: Arc<RetryingFetcher>,
    coordinator: ParallelFetchCoordinator,
}

impl Engine {
    /// Builds the session pool eagerly; fails if any session cannot start.
    pub async fn open(
        factory: Arc<dyn SessionFactory>,
        config: &EngineConfig,
    ) -> Result<Self, PoolError> {
        let pool = Arc::new(
            SessionPool::open(factory, config.pool_size, config.acquire_timeout()).await?,
        );
        let fetcher = Arc::new(RetryingFetcher::new(pool.clone(), config.retry_policy()));
        let coordinator = ParallelFetchCoordinator::new(fetcher.clone(), pool.capacity());
        info!("engine ready (pool size {})", config.pool_size);
        Ok(Self {
            pool,
            fetcher,
            coordinator,
        })
    }

    pub async fn fetch_one(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        self.fetcher.fetch(url).await
    }

    /// `fetch_one` with a retry policy for this call only.
    pub async fn fetch_one_with(
        &self,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<PageSnapshot, FetchError> {
        self.fetcher.fetch_with(url, policy).await
    }

    pub async fn fetch_many(&self, urls: &[String]) -> Vec<Result<PageSnapshot, FetchError>> {
        self.coordinator.fetch_all(urls).await
    }

    /// `fetch_many` with a retry policy for this batch only.
    pub async fn fetch_many_with(
        &self,
        urls: &[String],
        policy: RetryPolicy,
    ) -> Vec<Result<PageSnapshot, FetchError>> {
        self.coordinator.fetch_all_with(urls, policy).await
    }

    /// Tears down the pool. Must only be called once no fetch is in flight;
    /// the pool does not wait for checked-out sessions.
    pub async fn close(&self) {
        self.pool.shutdown().await;
    }
}
