use crate::config::EngineConfig;
use crate::model::SessionError;
use crate::session::traits::{Session, SessionFactory};

use reqwest::{Client, StatusCode};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) PagePoolBot/0.1";

/// HTTP-backed session: `navigate` performs the GET and buffers the document,
/// so by the time `wait_ready` runs the load is already complete and
/// readiness reduces to a structural check on the buffered body.
pub struct HttpSession {
    client: Client,
    ready_marker: Option<String>,
    current_url: String,
    last_status: Option<StatusCode>,
    body: String,
}

#[async_trait::async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.current_url = url.to_string();
        self.last_status = None;
        self.body.clear();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.last_status = Some(response.status());
        self.body = response
            .text()
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn wait_ready(&mut self, _window: Duration) -> Result<(), SessionError> {
        let status = self.last_status.ok_or_else(|| SessionError::NotReady {
            url: self.current_url.clone(),
            reason: "no page loaded".into(),
        })?;

        if !status.is_success() {
            return Err(SessionError::NotReady {
                url: self.current_url.clone(),
                reason: format!("status {}", status),
            });
        }

        if let Some(marker) = &self.ready_marker {
            if !self.body.contains(marker) {
                return Err(SessionError::NotReady {
                    url: self.current_url.clone(),
                    reason: format!("marker {:?} not found", marker),
                });
            }
        }

        Ok(())
    }

    fn content(&self) -> String {
        self.body.clone()
    }

    fn is_healthy(&self) -> bool {
        // An HTTP client holds no page state that can be poisoned; failed
        // requests leave the handle reusable.
        true
    }

    async fn close(&mut self) {
        self.body.clear();
        self.last_status = None;
    }
}

pub struct HttpSessionFactory {
    client: Client,
    ready_marker: Option<String>,
}

impl HttpSessionFactory {
    pub fn new(config: &EngineConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent(
                config
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .timeout(Duration::from_millis(config.per_attempt_timeout_ms))
            .build()
            .map_err(|e| SessionError::Creation(e.to_string()))?;

        Ok(Self {
            client,
            ready_marker: config.ready_marker.clone(),
        })
    }
}

#[async_trait::async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn create(&self) -> Result<Box<dyn Session>, SessionError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            ready_marker: self.ready_marker.clone(),
            current_url: String::new(),
            last_status: None,
            body: String::new(),
        }))
    }
}
