use crate::model::SessionError;
use std::time::Duration;

/// A stateful remote page-load handle. Navigation mutates the session, so a
/// session must never be driven by two callers at once; the pool enforces
/// that by handing out exclusive ownership.
#[async_trait::async_trait]
pub trait Session: Send {
    /// Drive the session to `url`. The transport applies its own I/O limits;
    /// the fetch layer bounds the whole attempt separately.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Wait up to `window` for the loaded document to satisfy the readiness
    /// condition (for the original system: a structural element present).
    async fn wait_ready(&mut self, window: Duration) -> Result<(), SessionError>;

    /// Snapshot of the current document. Only meaningful after a successful
    /// `wait_ready`.
    fn content(&self) -> String;

    /// Whether the underlying transport is still usable. Consulted by the
    /// pool on release; unhealthy sessions are destroyed, not re-pooled.
    fn is_healthy(&self) -> bool;

    async fn close(&mut self);
}

#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn Session>, SessionError>;
}
