//! Sliding-Window Rate Limiter
//!
//! Keeps a log of request timestamps per identifier under `ratelimit:{id}` and
//! admits a request only while fewer than `limit` of them fall inside the
//! trailing window.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::timestamp_to_datetime;
use crate::error::Result;
use crate::service::{decode, encode, log_failure, CacheService};

/// Key prefix for rate-limit records.
pub const RATE_LIMIT_PREFIX: &str = "ratelimit:";

/// Tag carried by every rate-limit record.
pub const RATE_LIMIT_TAG: &str = "ratelimit";

// == Rate Limit Decision ==
/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether this request was admitted
    pub allowed: bool,
    /// Slots left in the window once this request is counted
    pub remaining: u32,
    /// When the oldest request in the window leaves it
    pub reset_time: DateTime<Utc>,
}

/// Returns the cache key for a rate-limit identifier.
pub fn rate_limit_key(identifier: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, identifier)
}

impl CacheService {
    // == Check Rate Limit ==
    /// Records a request from `identifier` if it fits in the window.
    ///
    /// Timestamps older than `window_seconds` are dropped first. An admitted
    /// request is appended; a rejected one is not, so it never consumes a slot.
    /// Either way the trimmed log is written back, and the record expires once
    /// a full window passes with no admitted requests. A `limit` of 0 rejects
    /// everything.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        limit: u32,
        window_seconds: u64,
    ) -> RateLimitDecision {
        let key = rate_limit_key(identifier);
        let window_ms = i64::try_from(window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);

        // Read, trim, append and persist under one lock so concurrent checks
        // cannot both see the same free slot.
        let mut store = self.store.write().await;
        let now = self.clock.now_ms();
        let window_start = now.saturating_sub(window_ms);

        let mut requests: Vec<i64> = match store.get(&key) {
            Ok(value) => decode(&key, value).unwrap_or_default(),
            Err(err) => {
                log_failure("check_rate_limit", &key, &err);
                Vec::new()
            }
        };
        requests.retain(|&timestamp| timestamp > window_start);

        let used = u32::try_from(requests.len()).unwrap_or(u32::MAX);
        let allowed = used < limit;

        if allowed {
            requests.push(now);
        }

        let persisted = if requests.is_empty() {
            store.delete(&key).or_else(|err| if err.is_absent() { Ok(()) } else { Err(err) })
        } else {
            let ttl = window_seconds.max(1);
            encode(&requests).and_then(|value| store.set(&key, value, Some(ttl), [RATE_LIMIT_TAG]))
        };
        drop(store);

        let allowed = confirm_admission(allowed, &mut requests, persisted, &key);
        let remaining = limit.saturating_sub(u32::try_from(requests.len()).unwrap_or(u32::MAX));

        let oldest = requests.first().copied().unwrap_or(now);
        let reset_time = timestamp_to_datetime(oldest.saturating_add(window_ms));

        if allowed {
            debug!(
                "Rate limit passed for {}: {}/{} used",
                identifier,
                used + 1,
                limit
            );
        } else {
            warn!("Rate limit exceeded for {} ({} per {}s)", identifier, limit, window_seconds);
        }

        RateLimitDecision {
            allowed,
            remaining,
            reset_time,
        }
    }

    /// Forgets all recorded requests for `identifier`.
    pub async fn reset_rate_limit(&self, identifier: &str) -> bool {
        self.delete(&rate_limit_key(identifier)).await
    }
}

/// Settles a check once its log write has been attempted.
///
/// A request whose timestamp was not written back would not count against
/// later checks, so it is turned away.
fn confirm_admission(
    allowed: bool,
    requests: &mut Vec<i64>,
    persisted: Result<()>,
    key: &str,
) -> bool {
    match persisted {
        Ok(()) => allowed,
        Err(err) => {
            log_failure("check_rate_limit", key, &err);
            if allowed {
                requests.pop();
            }
            false
        }
    }
}
