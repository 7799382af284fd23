use pagepool::config::{EngineConfig, load_config};
use pagepool::engine::Engine;
use pagepool::session::HttpSessionFactory;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {:?}", panic_info);
    }));

    // Load configuration from file, falling back to defaults
    let config: EngineConfig = match load_config("config.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load error ({}), using defaults", e);
            EngineConfig::default()
        }
    };

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        error!("No URLs given. Usage: pagepool <url> [<url> ...]");
        return;
    }

    let factory = match HttpSessionFactory::new(&config) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Session factory error: {}", e);
            return;
        }
    };

    let engine = match Engine::open(factory, &config).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Engine startup failed: {}", e);
            return;
        }
    };

    info!("Fetching {} URLs with pool size {}...", urls.len(), config.pool_size);
    let results = engine.fetch_many(&urls).await;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(snapshot) => info!("{} -> {} bytes at {}", url, snapshot.content.len(), snapshot.fetched_at),
            Err(e) => warn!("{} -> {}", url, e),
        }
    }

    // All batch work has quiesced by now; safe to tear the pool down.
    engine.close().await;
    info!("Done.");
}
