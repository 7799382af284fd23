use crate::model::RetryPolicy;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub pool_size: usize,
    pub max_attempts: u32,
    pub per_attempt_timeout_ms: u64,
    pub backoff_ms: u64,
    /// Upper bound on waiting for an idle session; unset means wait forever.
    pub acquire_timeout_ms: Option<u64>,
    /// Substring the loaded document must contain before it counts as ready.
    pub ready_marker: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_attempts: 3,
            per_attempt_timeout_ms: 3_000,
            backoff_ms: 1_000,
            acquire_timeout_ms: None,
            ready_marker: None,
            user_agent: None,
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            per_attempt_timeout: Duration::from_millis(self.per_attempt_timeout_ms),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

pub fn load_config(path: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config: EngineConfig = serde_json::from_str(&content)?;
    Ok(config)
}
