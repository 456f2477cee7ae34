//! Session Store
//!
//! User sessions kept in the cache under `session:{id}`, tagged `session`.
//! Every successful read slides the session's expiry forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::cache::CacheStore;
use crate::service::{decode, encode, log_failure, report, CacheService};

/// Key prefix for session entries.
pub const SESSION_PREFIX: &str = "session:";

/// Tag carried by every session entry.
pub const SESSION_TAG: &str = "session";

/// Lifetime of a session, restarted on every read: 24 hours.
pub const DEFAULT_SESSION_TTL: u64 = 86_400;

// == Session Data ==
/// Identity and activity of a logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    /// Set once when the session is created
    pub login_time: DateTime<Utc>,
    /// Updated on every successful read
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl SessionData {
    /// Creates a session that logged in (and was last active) at `now`.
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: name.into(),
            role: role.into(),
            login_time: now,
            last_activity: now,
            permissions: None,
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|perms| perms.iter().any(|p| p == permission))
    }

    /// Overlays every field set in `update`.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(user_id) = update.user_id {
            self.user_id = user_id;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(login_time) = update.login_time {
            self.login_time = login_time;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = Some(permissions);
        }
    }
}

// == Session Update ==
/// Partial changes to a session; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub login_time: Option<DateTime<Utc>>,
    pub permissions: Option<Vec<String>>,
}

/// Returns the cache key for a session id.
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

impl CacheService {
    // == Create Session ==
    /// Stores a session for `ttl` seconds (24 hours when None).
    pub async fn create_session(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: Option<u64>,
    ) -> bool {
        let key = session_key(session_id);
        self.set(
            &key,
            data,
            Some(ttl.unwrap_or(DEFAULT_SESSION_TTL)),
            &[SESSION_TAG],
        )
        .await
    }

    // == Get Session ==
    /// Returns the session and marks it active now.
    ///
    /// The refreshed session is written back with a fresh 24 hour TTL, so a
    /// session read at least once a day never expires.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let key = session_key(session_id);
        let now = self.clock.now();
        let mut store = self.store.write().await;
        touch_session(&mut store, &key, now)
    }

    // == Update Session ==
    /// Merges `update` into an existing session and restarts its 24 hour TTL.
    ///
    /// Returns false if the session does not exist.
    pub async fn update_session(&self, session_id: &str, update: SessionUpdate) -> bool {
        let key = session_key(session_id);
        let now = self.clock.now();
        let mut store = self.store.write().await;

        let Some(mut session) = touch_session(&mut store, &key, now) else {
            return false;
        };
        session.apply(update);
        session.last_activity = now;

        let result = encode(&session)
            .and_then(|value| store.set(&key, value, Some(DEFAULT_SESSION_TTL), [SESSION_TAG]));
        report("update_session", &key, result)
    }

    // == Delete Session ==
    pub async fn delete_session(&self, session_id: &str) -> bool {
        self.delete(&session_key(session_id)).await
    }

    // == Get All Sessions ==
    /// Returns every live session, optionally only those belonging to `user_id`.
    ///
    /// Order is unspecified.
    pub async fn get_all_sessions(&self, user_id: Option<&str>) -> Vec<SessionData> {
        let entries = self.store.write().await.tagged_entries(SESSION_TAG);

        entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(SESSION_PREFIX))
            .filter_map(|(key, value)| decode::<SessionData>(&key, value))
            .filter(|session| user_id.map_or(true, |id| session.user_id == id))
            .collect()
    }
}

/// Reads a session, stamps `last_activity` and writes it back with a fresh TTL.
///
/// Runs under the caller's write lock.
fn touch_session(store: &mut CacheStore, key: &str, now: DateTime<Utc>) -> Option<SessionData> {
    let value = match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            log_failure("get_session", key, &err);
            return None;
        }
    };

    let mut session: SessionData = decode(key, value)?;
    session.last_activity = now;

    let written = encode(&session)
        .and_then(|value| store.set(key, value, Some(DEFAULT_SESSION_TTL), [SESSION_TAG]));
    match written {
        Ok(()) => debug!("Session refreshed: {}", key),
        Err(err) => error!("Could not refresh session {}: {}", key, err),
    }

    Some(session)
}
