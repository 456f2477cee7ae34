//! Tagcache - An in-process tagged, expiring key-value cache
//!
//! Values expire after a TTL and can be invalidated in groups by tag. On top of
//! the entry store sit a session store with sliding expiry, per-domain cache
//! helpers, and a sliding-window rate limiter.

pub mod cache;
pub mod clock;
pub mod config;
pub mod domains;
pub mod error;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod tasks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConnectionSettings};
pub use rate_limit::RateLimitDecision;
pub use service::{CacheService, HealthReport};
pub use session::{SessionData, SessionUpdate};
pub use tasks::spawn_sweep_task;
