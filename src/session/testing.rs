// Scripted in-memory sessions for exercising pool and fetch behavior
// without a network.

use crate::model::SessionError;
use crate::session::traits::{Session, SessionFactory};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Default)]
pub struct MockState {
    /// url -> number of attempts to fail before succeeding.
    fail_first: Mutex<HashMap<String, u32>>,
    /// url -> simulated load latency.
    latency: Mutex<HashMap<String, Duration>>,
    /// URLs that leave the session unhealthy after a (successful) load.
    poison_urls: Mutex<Vec<String>>,
    pub attempts: AtomicU32,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
}

impl MockState {
    pub fn fail_first_for(&self, url: &str, failures: u32) {
        self.fail_first.lock().unwrap().insert(url.into(), failures);
    }

    pub fn latency_for(&self, url: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(url.into(), latency);
    }

    pub fn poison_on(&self, url: &str) {
        self.poison_urls.lock().unwrap().push(url.into());
    }
}

pub struct MockSession {
    state: Arc<MockState>,
    body: String,
    healthy: bool,
}

#[async_trait::async_trait]
impl Session for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        let latency = self.state.latency.lock().unwrap().get(url).copied();
        if let Some(latency) = latency {
            sleep(latency).await;
        }

        let failed = {
            let mut fail_first = self.state.fail_first.lock().unwrap();
            match fail_first.get_mut(url) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        if self.state.poison_urls.lock().unwrap().iter().any(|u| u == url) {
            self.healthy = false;
        }

        self.state.active.fetch_sub(1, Ordering::SeqCst);

        if failed {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".into(),
            });
        }

        self.body = format!("<body>{url}</body>");
        Ok(())
    }

    async fn wait_ready(&mut self, _window: Duration) -> Result<(), SessionError> {
        Ok(())
    }

    fn content(&self) -> String {
        self.body.clone()
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }

    async fn close(&mut self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockFactory {
    pub state: Arc<MockState>,
    /// 1-based index of the `create` call that fails, for init-unwind tests.
    pub fail_creation_at: Option<usize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            fail_creation_at: None,
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for MockFactory {
    async fn create(&self) -> Result<Box<dyn Session>, SessionError> {
        let n = self.state.created.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_creation_at == Some(n) {
            self.state.created.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::Creation("scripted creation failure".into()));
        }
        Ok(Box::new(MockSession {
            state: self.state.clone(),
            body: String::new(),
            healthy: true,
        }))
    }
}
