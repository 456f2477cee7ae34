//! Cache Service
//!
//! Cloneable handle over one shared `CacheStore`. This is the surface the rest of
//! an application talks to: every operation resolves to a boolean, an `Option`
//! or a count, and internal failures are logged instead of propagated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Handle to a shared cache.
///
/// Clones share the same store. All mutations go through one write lock, so a
/// compound read-modify-write (session refresh, rate-limit check) is never
/// interleaved with another writer.
#[derive(Debug, Clone)]
pub struct CacheService {
    pub(crate) store: Arc<RwLock<CacheStore>>,
    pub(crate) clock: Arc<dyn Clock>,
    config: Arc<Config>,
    connected: Arc<AtomicBool>,
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// "healthy", "disconnected" or "unconfigured"
    pub status: String,
    pub configured: bool,
    pub connected: bool,
    pub total_keys: usize,
}

impl CacheService {
    // == Constructors ==
    /// Creates a new service on the system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new service driven by the given clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let store = CacheStore::with_clock(config.default_ttl, clock.clone());
        Self {
            store: Arc::new(RwLock::new(store)),
            clock,
            config: Arc::new(config),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Lifecycle ==
    /// Reports whether connection settings were supplied.
    ///
    /// Says nothing about whether `connect` has been called.
    pub fn is_configured(&self) -> bool {
        self.config.connection.is_some()
    }

    /// Reports whether `connect` succeeded and `disconnect` has not been called since.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Marks the cache as connected.
    ///
    /// Returns false when no connection settings are configured.
    pub async fn connect(&self) -> bool {
        let Some(connection) = self.config.connection.as_ref() else {
            warn!("Cache connect skipped: no connection settings configured");
            return false;
        };

        info!(
            "Connecting to cache at {}:{} (db {})",
            connection.host, connection.port, connection.db
        );
        self.connected.store(true, Ordering::SeqCst);
        info!("Cache connected");
        true
    }

    /// Marks the cache as disconnected and drops every entry.
    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let dropped = self.store.write().await.flush_all();
        info!("Cache disconnected, {} entries dropped", dropped);
    }

    /// Returns a health report for the cache.
    pub async fn health(&self) -> HealthReport {
        let configured = self.is_configured();
        let connected = self.is_connected();
        let total_keys = self.store.write().await.stats().total_keys;

        let status = match (configured, connected) {
            (false, _) => "unconfigured",
            (true, false) => "disconnected",
            (true, true) => "healthy",
        };

        HealthReport {
            status: status.to_string(),
            configured,
            connected,
            total_keys,
        }
    }

    // == Get ==
    /// Returns the value stored at `key`, or None if it is missing, expired or
    /// cannot be decoded as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let result = self.store.write().await.get(key);
        match result {
            Ok(value) => decode(key, value),
            Err(err) => {
                log_failure("get", key, &err);
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` at `key`, replacing any prior entry and its tags.
    ///
    /// `ttl` of None uses the configured default TTL. Returns false on invalid
    /// input or if the value cannot be serialized.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        tags: &[&str],
    ) -> bool {
        let result = match encode(value) {
            Ok(value) => self
                .store
                .write()
                .await
                .set(key, value, ttl, tags.iter().copied()),
            Err(err) => Err(err),
        };
        report("set", key, result)
    }

    // == Delete ==
    /// Removes `key`. Returns whether a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let result = self.store.write().await.delete(key);
        report("delete", key, result)
    }

    // == Exists ==
    pub async fn exists(&self, key: &str) -> bool {
        self.store.write().await.exists(key)
    }

    // == Expire ==
    /// Gives a live entry a fresh TTL. Returns false if the key is absent.
    pub async fn expire(&self, key: &str, ttl: u64) -> bool {
        let result = self.store.write().await.expire(key, ttl);
        report("expire", key, result)
    }

    // == TTL ==
    /// Returns the remaining lifetime of `key` in seconds.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let result = self.store.write().await.ttl(key);
        match result {
            Ok(secs) => Some(secs),
            Err(err) => {
                log_failure("ttl", key, &err);
                None
            }
        }
    }

    // == Flush All ==
    pub async fn flush_all(&self) {
        let dropped = self.store.write().await.flush_all();
        info!("Cache flushed, {} entries dropped", dropped);
    }

    // == Invalidate By Tag ==
    /// Removes every entry tagged `tag` and returns how many were removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let removed = self.store.write().await.invalidate_by_tag(tag);
        info!("Invalidated {} items with tag: {}", removed, tag);
        removed
    }

    // == Sweep Expired ==
    /// Drops every expired entry and returns how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.store.write().await.sweep_expired()
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.store.write().await.stats()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

// == Helpers ==
/// Decodes a stored value, treating a shape mismatch as a miss.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!("Cached value at {} has an unexpected shape: {}", key, err);
            None
        }
    }
}

/// Encodes a value for storage.
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Collapses an operation result to the boolean contract, logging real failures.
pub(crate) fn report(op: &str, key: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log_failure(op, key, &err);
            false
        }
    }
}

/// Logs an error unless it only signals absence.
pub(crate) fn log_failure(op: &str, key: &str, err: &CacheError) {
    match err {
        err if err.is_absent() => {}
        CacheError::InvalidRequest(_) => warn!("Cache {} rejected for {}: {}", op, key, err),
        _ => error!("Cache {} failed for {}: {}", op, key, err),
    }
}
