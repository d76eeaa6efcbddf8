//! In-memory session store.
//!
//! Sessions live in a concurrent map keyed by session id. Expiry is lazy: a
//! lookup past `expires_at` behaves exactly like a miss and drops the stale
//! record. All read-modify-write sequences go through [`SessionStore`]
//! methods so same-key atomicity never depends on the caller.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::AuthError;

/// Client details captured when a session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Client IP address, empty if unknown.
    #[serde(default)]
    pub ip_address: String,

    /// Client user agent, empty if unknown.
    #[serde(default)]
    pub user_agent: String,
}

impl SessionMetadata {
    /// Creates metadata from the client address and user agent.
    #[must_use]
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// A live login session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session id, never reused.
    pub id: String,

    /// The user this session belongs to.
    pub user_id: String,

    /// Client details captured at creation.
    pub metadata: SessionMetadata,

    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Expiry time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Returns `true` if the session has passed its expiry time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// Generates a session id with 256 bits of entropy.
fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Concurrency-safe in-memory session store.
///
/// Initialized once at process start; there is no teardown beyond process
/// exit. Sessions expire `ttl` after creation.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store whose sessions live for `ttl` after creation.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Creates a new session for the given user.
    ///
    /// Session ids come from a cryptographic random source, so two concurrent
    /// calls never collide.
    pub fn create(&self, user_id: impl Into<String>, metadata: SessionMetadata) -> Session {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.into(),
            metadata,
            created_at: now,
            expires_at: now + self.ttl,
        };

        debug!(session = %session.id, user = %session.user_id, "Created session");
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Looks up a session by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionNotFound`] if the session is absent or
    /// expired. An expired record is removed on the way out.
    pub fn get(&self, id: &str) -> Result<Session, AuthError> {
        if let Some(session) = self.sessions.get(id) {
            if !session.is_expired() {
                return Ok(session.clone());
            }
        }
        // Past expiry a record behaves exactly like an absent one; the read
        // guard is out of scope here, so removal cannot deadlock the shard.
        self.sessions.remove(id);
        Err(AuthError::SessionNotFound)
    }

    /// Deletes a session.
    ///
    /// Returns `true` only if a live record was removed; deleting an absent
    /// or already-expired session returns `false`.
    pub fn delete(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                let was_live = !session.is_expired();
                if was_live {
                    debug!(session = %id, "Deleted session");
                }
                was_live
            }
            None => false,
        }
    }

    /// Deletes every session belonging to the given user.
    ///
    /// Returns the number of records removed.
    pub fn delete_all_for_user(&self, user_id: &str) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            if session.user_id == user_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            debug!(user = %user_id, count = removed, "Deleted all sessions for user");
        }
        removed
    }

    /// Returns the number of stored records, including not-yet-collected
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
