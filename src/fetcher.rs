use crate::model::{FetchError, PageSnapshot, RetryPolicy, SessionError};
use crate::pool::{PooledSession, SessionPool};

use chrono::Utc;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Outcome of a single load attempt. Driving the retry loop off a value
/// keeps failure handling in one match instead of scattered catch sites.
enum Attempt {
    Loaded(PageSnapshot),
    Failed(SessionError),
}

/// Fetches one URL through a pooled session: acquire, bounded sequential
/// attempts with fixed backoff, and an unconditional release on every path.
pub struct RetryingFetcher {
    pool: Arc<SessionPool>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(pool: Arc<SessionPool>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    /// Fetches with the policy the fetcher was built with.
    pub async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let policy = self.policy.clone();
        self.fetch_with(url, &policy).await
    }

    /// Fetches with a caller-supplied retry policy for this call only.
    pub async fn fetch_with(
        &self,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<PageSnapshot, FetchError> {
        // Pool faults are fatal to the call and consume no retry.
        let mut pooled = self.pool.acquire().await?;

        let outcome = self.run_attempts(&mut pooled, url, policy).await;

        // The session goes back whatever happened above. A failed release is
        // a bookkeeping bug and must not be swallowed.
        if let Err(e) = self.pool.release(pooled).await {
            warn!("release after fetching {} failed: {}", url, e);
            return Err(e.into());
        }
        outcome
    }

    async fn run_attempts(
        &self,
        pooled: &mut PooledSession,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<PageSnapshot, FetchError> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(pooled, url, policy).await {
                Attempt::Loaded(snapshot) => {
                    debug!("fetched {} on attempt {}/{}", url, attempt, max_attempts);
                    return Ok(snapshot);
                }
                Attempt::Failed(cause) if attempt >= max_attempts => {
                    warn!("giving up on {} after {} attempts: {}", url, attempt, cause);
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_cause: cause,
                    });
                }
                Attempt::Failed(cause) => {
                    debug!(
                        "attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, url, cause
                    );
                    sleep(policy.backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One navigate + readiness wait + snapshot, bounded as a whole by the
    /// per-attempt timeout.
    async fn attempt(&self, pooled: &mut PooledSession, url: &str, policy: &RetryPolicy) -> Attempt {
        let window = policy.per_attempt_timeout;
        let session = pooled.session.as_mut();
        let load = async {
            session.navigate(url).await?;
            session.wait_ready(window).await?;
            Ok::<String, SessionError>(session.content())
        };
        match timeout(window, load).await {
            Ok(Ok(content)) => Attempt::Loaded(PageSnapshot {
                url: url.to_string(),
                content,
                fetched_at: Utc::now(),
            }),
            Ok(Err(cause)) => Attempt::Failed(cause),
            Err(_) => Attempt::Failed(SessionError::ReadinessTimeout {
                ms: window.as_millis() as u64,
            }),
        }
    }
}
