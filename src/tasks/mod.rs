//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiration sweep: drops expired cache entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
