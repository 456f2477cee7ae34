//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and tag support.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// Labels used for group invalidation
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl_seconds` after `now_ms`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now_ms` - Current time in Unix milliseconds
    /// * `ttl_seconds` - Lifetime in seconds
    /// * `tags` - Tags attached to the entry (duplicates collapse)
    pub fn new<I, S>(value: Value, now_ms: i64, ttl_seconds: u64, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value,
            created_at: now_ms,
            expires_at: expiry_from(now_ms, ttl_seconds),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry whose expiration time is at or before now
    /// is expired, so once the TTL has fully elapsed the entry is gone.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Returns true if the entry carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    // == Refresh Expiry ==
    /// Moves the expiration to `ttl_seconds` after `now_ms`, leaving value and tags alone.
    pub fn refresh_expiry(&mut self, now_ms: i64, ttl_seconds: u64) {
        self.expires_at = expiry_from(now_ms, ttl_seconds);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self, now_ms: i64) -> u64 {
        self.expires_at.saturating_sub(now_ms).max(0) as u64
    }

    /// Returns remaining TTL in whole seconds, rounded up so a live entry never reports 0.
    pub fn ttl_remaining(&self, now_ms: i64) -> u64 {
        self.ttl_remaining_ms(now_ms).div_ceil(1000)
    }

    // == Size Estimate ==
    /// Returns the size in bytes of the entry's JSON form.
    pub fn estimated_size(&self) -> serde_json::Result<usize> {
        serde_json::to_vec(self).map(|bytes| bytes.len())
    }
}

fn expiry_from(now_ms: i64, ttl_seconds: u64) -> i64 {
    let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
    now_ms.saturating_add(ttl_ms)
}
