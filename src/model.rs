// Core structs: PageSnapshot, RetryPolicy + engine error types
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub type SessionId = u64;

/// Raw content captured from a successfully loaded page. Opaque to the
/// engine; the extraction layer downstream decides what it means.
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub url: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(3),
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session creation failed: {0}")]
    Creation(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page at {url} not ready: {reason}")]
    NotReady { url: String, reason: String },

    #[error("readiness wait timed out after {ms}ms")]
    ReadinessTimeout { ms: u64 },
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("session pool is closed")]
    Closed,

    #[error("timed out after {ms}ms waiting for an idle session")]
    AcquireTimeout { ms: u64 },

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("pool initialization failed")]
    Creation(#[source] SessionError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch of {url} exhausted after {attempts} attempts")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last_cause: SessionError,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}
