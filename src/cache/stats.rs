//! Cache Statistics Module
//!
//! Tracks hits, misses and expirations, and defines the stats snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

// == Cache Counters ==
/// Running counters kept by the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheCounters {
    /// Number of reads that found a live entry
    pub hits: u64,
    /// Number of reads that found nothing (missing or expired)
    pub misses: u64,
    /// Number of entries dropped because their TTL elapsed
    pub expired: u64,
}

impl CacheCounters {
    // == Constructor ==
    /// Creates counters all at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache, taken right after an expiration sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of live entries
    pub total_keys: usize,
    /// Sum of the JSON sizes of all live entries
    pub memory_bytes: usize,
    /// `memory_bytes` rendered for humans, e.g. "1.5 KB"
    pub memory_usage: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Live entries per tag
    pub keys_by_tag: BTreeMap<String, usize>,
    /// Entries dropped because they expired, since the store was created
    pub expired_keys: u64,
}

// == Format Bytes ==
/// Renders a byte count with a binary unit, keeping at most two decimals.
///
/// `0` → "0 Bytes", `1536` → "1.5 KB", `1048576` → "1 MB".
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}
