use crate::model::{PoolError, SessionId};
use crate::session::{Session, SessionFactory};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tracing::{info, warn};

/// A session checked out of the pool. Exclusive by construction: the pool
/// moves the boxed session out on acquire and only takes it back on release.
pub struct PooledSession {
    pub(crate) id: SessionId,
    pub(crate) session: Box<dyn Session>,
}

impl PooledSession {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl std::fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession").field("id", &self.id).finish_non_exhaustive()
    }
}

struct PoolState {
    idle: Vec<PooledSession>,
    checked_out: HashSet<SessionId>,
    closed: bool,
}

/// Fixed-capacity pool of page-load sessions. Acquire blocks until a session
/// is idle (optionally bounded); release puts it back and wakes one waiter;
/// shutdown destroys every idle session and fails all later acquires.
pub struct SessionPool {
    capacity: usize,
    factory: Arc<dyn SessionFactory>,
    state: Mutex<PoolState>,
    idle_available: Notify,
    acquire_timeout: Option<Duration>,
    next_id: AtomicU64,
}

impl SessionPool {
    /// Creates every session up front. A single creation failure unwinds the
    /// sessions already created and fails the whole open; the pool never
    /// starts undersized.
    pub async fn open(
        factory: Arc<dyn SessionFactory>,
        capacity: usize,
        acquire_timeout: Option<Duration>,
    ) -> Result<Self, PoolError> {
        let mut idle: Vec<PooledSession> = Vec::with_capacity(capacity);
        for n in 0..capacity {
            match factory.create().await {
                Ok(session) => idle.push(PooledSession {
                    id: n as SessionId,
                    session,
                }),
                Err(e) => {
                    warn!("session {} of {} failed to start: {}", n + 1, capacity, e);
                    for mut pooled in idle {
                        pooled.session.close().await;
                    }
                    return Err(PoolError::Creation(e));
                }
            }
        }
        info!("session pool ready with {} sessions", capacity);

        Ok(Self {
            capacity,
            factory,
            state: Mutex::new(PoolState {
                idle,
                checked_out: HashSet::new(),
                closed: false,
            }),
            idle_available: Notify::new(),
            acquire_timeout,
            next_id: AtomicU64::new(capacity as u64),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks until a session is idle and checks it out. Fails with
    /// `PoolError::Closed` once the pool has shut down, and with
    /// `PoolError::AcquireTimeout` when a configured wait bound elapses.
    pub async fn acquire(&self) -> Result<PooledSession, PoolError> {
        match self.acquire_timeout {
            Some(limit) => timeout(limit, self.acquire_inner())
                .await
                .map_err(|_| PoolError::AcquireTimeout {
                    ms: limit.as_millis() as u64,
                })?,
            None => self.acquire_inner().await,
        }
    }

    async fn acquire_inner(&self) -> Result<PooledSession, PoolError> {
        loop {
            // Register for the wakeup before re-checking state so a release
            // that lands between the check and the await is not lost.
            let notified = self.idle_available.notified();
            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(PoolError::Closed);
                }
                if let Some(pooled) = state.idle.pop() {
                    state.checked_out.insert(pooled.id);
                    return Ok(pooled);
                }
            }
            notified.await;
        }
    }

    /// Returns a session to the idle set and wakes one waiter. Releasing a
    /// session the pool does not consider checked out is a caller bug and
    /// fails loudly. An unhealthy session is destroyed and its slot refilled
    /// from the factory instead of being re-pooled.
    pub async fn release(&self, mut pooled: PooledSession) -> Result<(), PoolError> {
        let mut state = self.state.lock().await;
        if !state.checked_out.remove(&pooled.id) {
            return Err(PoolError::InvalidState(format!(
                "session {} is not checked out",
                pooled.id
            )));
        }

        if state.closed {
            // Shutdown already ran; nothing to re-pool.
            drop(state);
            pooled.session.close().await;
            return Ok(());
        }

        if pooled.session.is_healthy() {
            state.idle.push(pooled);
            self.idle_available.notify_one();
            return Ok(());
        }

        let id = pooled.id;
        drop(state);
        warn!("discarding unhealthy session {}", id);
        pooled.session.close().await;

        match self.factory.create().await {
            Ok(session) => {
                let mut replacement = PooledSession {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    session,
                };
                let mut state = self.state.lock().await;
                if state.closed {
                    drop(state);
                    replacement.session.close().await;
                } else {
                    state.idle.push(replacement);
                    self.idle_available.notify_one();
                }
            }
            Err(e) => warn!("failed to replace unhealthy session {}: {}", id, e),
        }
        Ok(())
    }

    /// Destroys every idle session and marks the pool closed. Idempotent.
    /// Does not wait for checked-out sessions; the engine owner guarantees
    /// fetch work has quiesced before shutting down.
    pub async fn shutdown(&self) {
        let drained = {
            let mut state = self.state.lock().await;
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.idle)
        };
        for mut pooled in drained {
            pooled.session.close().await;
        }
        self.idle_available.notify_waiters();
        info!("session pool shut down");
    }
}
