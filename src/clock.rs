//! Clock Module
//!
//! Time source used for every expiry computation in the cache.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

// == Clock Trait ==
/// Source of the current time, in Unix milliseconds.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current Unix timestamp in milliseconds.
    fn now_ms(&self) -> i64;

    /// Returns the current time as a UTC datetime.
    fn now(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.now_ms())
    }
}

// == System Clock ==
/// Wall clock backed by `chrono::Utc::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

// == Manual Clock ==
/// Clock that only moves when told to.
///
/// Lets callers (and tests) simulate the passage of time without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock frozen at the given Unix millisecond timestamp.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// Creates a manual clock frozen at the given datetime.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self::new(start.timestamp_millis())
    }

    /// Moves the clock forward, saturating at `i64::MAX`.
    pub fn advance(&self, by: Duration) {
        let by_ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        // fetch_update only errs when the closure returns None
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by_ms))
            });
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Jumps the clock to an absolute timestamp.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Converts Unix milliseconds to a UTC datetime, clamping out-of-range values to the epoch.
pub fn timestamp_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}
