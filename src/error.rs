//! Error types for the cache
//!
//! Provides unified error handling using thiserror. These errors stay inside the
//! crate's internal layers; `CacheService` turns them into boolean/optional results.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache internals.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Invalid request data (bad key, zero TTL, oversized value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be converted to or from its stored JSON form
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns true when the error only means "nothing is cached here".
    pub fn is_absent(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
