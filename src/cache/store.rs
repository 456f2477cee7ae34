//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with a tag index and TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::stats::format_bytes;
use crate::cache::{CacheCounters, CacheEntry, CacheStats, TagIndex};
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Main cache storage with tag-based invalidation and TTL support.
///
/// Not synchronized on its own; `CacheService` wraps it in a lock.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Tag to keys reverse index
    tags: TagIndex,
    /// Hit/miss/expiry counters
    counters: CacheCounters,
    /// Time source for expiry math
    clock: Arc<dyn Clock>,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore on the system clock.
    ///
    /// # Arguments
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(default_ttl: u64) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates a new CacheStore driven by the given clock.
    pub fn with_clock(default_ttl: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            tags: TagIndex::new(),
            counters: CacheCounters::new(),
            clock,
            default_ttl,
        }
    }

    /// Returns the TTL used when `set` is called without one.
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Set ==
    /// Stores a value with optional TTL and tags.
    ///
    /// If the key already exists, the value, TTL and tags are all replaced.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None), must be positive
    ///
    /// Keys and values have no size limit; only an empty key is rejected.
    /// * `tags` - Tags for group invalidation
    pub fn set<I, S>(&mut self, key: &str, value: Value, ttl: Option<u64>, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_key(key)?;

        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl == 0 {
            return Err(CacheError::InvalidRequest(format!(
                "TTL for key '{}' must be positive",
                key
            )));
        }

        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl, tags);

        // Old tag associations go before the new ones are recorded
        self.remove_entry(key);
        self.tags.attach(key, &entry.tags);
        self.entries.insert(key.to_string(), entry);

        debug!("Cached: {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired.
    /// Expired entries are removed and counted as misses.
    ///
    /// # Arguments
    /// * `key` - The key to retrieve
    pub fn get(&mut self, key: &str) -> Result<Value> {
        match self.live_entry(key) {
            Ok(entry) => {
                let value = entry.value.clone();
                self.counters.record_hit();
                Ok(value)
            }
            Err(err) => {
                self.counters.record_miss();
                Err(err)
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// An entry that had already expired is dropped but reported as expired.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let now = self.clock.now_ms();
        match self.remove_entry(key) {
            Some(entry) if entry.is_expired(now) => {
                self.counters.record_expired(1);
                Err(CacheError::Expired(key.to_string()))
            }
            Some(_) => {
                debug!("Cache deleted: {}", key);
                Ok(())
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    // == Exists ==
    /// Returns true if a live entry exists for `key`.
    ///
    /// Does not count towards hits or misses.
    pub fn exists(&mut self, key: &str) -> bool {
        self.live_entry(key).is_ok()
    }

    // == Expire ==
    /// Resets the TTL of a live entry without touching its value or tags.
    pub fn expire(&mut self, key: &str, ttl: u64) -> Result<()> {
        if ttl == 0 {
            return Err(CacheError::InvalidRequest(format!(
                "TTL for key '{}' must be positive",
                key
            )));
        }

        let now = self.clock.now_ms();
        self.live_entry(key)?;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.refresh_expiry(now, ttl);
                Ok(())
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    // == TTL ==
    /// Returns the remaining lifetime of a live entry in seconds.
    pub fn ttl(&mut self, key: &str) -> Result<u64> {
        let now = self.clock.now_ms();
        self.live_entry(key).map(|entry| entry.ttl_remaining(now))
    }

    // == Flush All ==
    /// Removes every entry. Returns the number of entries dropped.
    pub fn flush_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.tags.clear();
        count
    }

    // == Invalidate By Tag ==
    /// Removes every entry carrying `tag`.
    ///
    /// Returns the number of live entries removed; entries that had already
    /// expired are dropped too but counted as expirations.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        let mut expired = 0;

        for key in self.tags.keys(tag) {
            match self.remove_entry(&key) {
                Some(entry) if entry.is_expired(now) => expired += 1,
                Some(_) => removed += 1,
                None => {}
            }
        }

        self.counters.record_expired(expired);
        removed
    }

    // == Tagged Entries ==
    /// Returns `(key, value)` for all live entries carrying `tag`, in no particular order.
    pub fn tagged_entries(&mut self, tag: &str) -> Vec<(String, Value)> {
        self.sweep_expired();
        self.tags
            .keys(tag)
            .into_iter()
            .filter_map(|key| {
                let value = self.entries.get(&key)?.value.clone();
                Some((key, value))
            })
            .collect()
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.counters.record_expired(count);
        count
    }

    // == Stats ==
    /// Returns a statistics snapshot, sweeping expired entries first.
    pub fn stats(&mut self) -> CacheStats {
        self.sweep_expired();

        let memory_bytes: usize = self
            .entries
            .iter()
            .map(|(key, entry)| match entry.estimated_size() {
                Ok(size) => size,
                Err(err) => {
                    warn!("Could not estimate size of {}: {}", key, err);
                    0
                }
            })
            .sum();

        CacheStats {
            total_keys: self.entries.len(),
            memory_bytes,
            memory_usage: format_bytes(memory_bytes),
            hits: self.counters.hits,
            misses: self.counters.misses,
            hit_rate: self.counters.hit_rate(),
            keys_by_tag: self.tags.counts(),
            expired_keys: self.counters.expired,
        }
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `key` if it is live, dropping it if it expired.
    fn live_entry(&mut self, key: &str) -> Result<&CacheEntry> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return Err(CacheError::NotFound(key.to_string())),
        };

        if expired {
            self.remove_entry(key);
            self.counters.record_expired(1);
            return Err(CacheError::Expired(key.to_string()));
        }

        self.entries
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Removes an entry together with its tag associations.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.tags.detach(key, &entry.tags);
        Some(entry)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    Ok(())
}
