//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and tag-based invalidation.

mod entry;
mod stats;
mod store;
mod tags;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::{format_bytes, CacheCounters, CacheStats};
pub use store::CacheStore;
pub use tags::TagIndex;
