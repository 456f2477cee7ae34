//! Tagcache host process
//!
//! Runs a cache instance with its background expiration sweep until shutdown,
//! logging a stats snapshot on the way out.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagcache::{spawn_sweep_task, CacheService, Config};

/// Main entry point for the cache host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache service and connect it
/// 4. Start background expiration sweep
/// 5. Wait for SIGINT/SIGTERM, then stop the sweep and disconnect
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tagcache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: configured={}, default_ttl={}s, cleanup_interval={}s",
        config.connection.is_some(),
        config.default_ttl,
        config.cleanup_interval
    );

    let cleanup_interval = Duration::from_secs(config.cleanup_interval);
    let cache = CacheService::new(config);
    if !cache.connect().await {
        warn!("Cache is not configured; running without a connection");
    }

    let sweep_handle = spawn_sweep_task(cache.clone(), cleanup_interval);
    info!("Background expiration sweep started");

    shutdown_signal().await.context("failed to listen for shutdown signal")?;

    sweep_handle.abort();
    warn!("Expiration sweep aborted");

    let stats = cache.stats().await;
    info!(
        "Final stats: {} keys, {} in use, hit rate {:.2}, {} expired",
        stats.total_keys, stats.memory_usage, stats.hit_rate, stats.expired_keys
    );

    cache.disconnect().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
