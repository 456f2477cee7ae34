//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

/// Connection settings for the backing cache server.
///
/// The in-process cache never dials out; these only decide whether the
/// cache counts as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection settings, None when the cache is unconfigured
    pub connection: Option<ConnectionSettings>,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Cache host (default: localhost)
    /// - `REDIS_PORT` - Cache port (default: 6379)
    /// - `REDIS_PASSWORD` - Optional password
    /// - `REDIS_DB` - Database index (default: 0)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 900)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let connection = ConnectionSettings {
            host: env::var("REDIS_HOST")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            port: parse_var("REDIS_PORT").unwrap_or(6379),
            password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
            db: parse_var("REDIS_DB").unwrap_or(0),
        };

        Self {
            connection: Some(connection),
            default_ttl: parse_var::<u64>("DEFAULT_TTL")
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var::<u64>("CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Returns a config with no connection settings.
    pub fn unconfigured() -> Self {
        Self {
            connection: None,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: Some(ConnectionSettings::default()),
            default_ttl: 3600,
            cleanup_interval: 900,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
