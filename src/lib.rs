// Pooled page-fetch engine: a bounded pool of stateful page-load sessions
// driving retried, bounded-concurrency fetches with input-ordered results.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod fetcher;
pub mod model;
pub mod pool;
pub mod session;

pub use config::{EngineConfig, load_config};
pub use engine::Engine;
pub use model::{FetchError, PageSnapshot, PoolError, RetryPolicy, SessionError};
pub use session::{HttpSessionFactory, Session, SessionFactory};
