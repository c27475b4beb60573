//! Server-side session store
//!
//! Sessions are keyed by an opaque token; the client only ever holds the
//! token in a cookie. Entries expire a fixed TTL after creation and are
//! reaped lazily on access.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Identity carried by a live session
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Token-keyed session map shared across request tasks
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Create a session for a user and return its opaque token. The entry
    /// is visible to other tasks before this returns, so a caller that
    /// immediately issues an authenticated request cannot race ahead of it.
    pub fn create(&self, user_id: Uuid, email: &str) -> Uuid {
        // Abandoned sessions are never presented again, so sweep them
        // here rather than waiting for their own token to come back
        self.sessions.retain(|_, session| !session.is_expired());

        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                user_id,
                email: email.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    /// Look up a session by token. Expired entries are removed and
    /// reported as absent.
    pub fn get(&self, token: Uuid) -> Option<Session> {
        let expired = match self.sessions.get(&token) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => return Some(entry.clone()),
            None => return None,
        };
        if expired {
            self.sessions.remove(&token);
        }
        None
    }

    /// Destroy a session. Destroying an unknown or already-destroyed
    /// token is not an error.
    pub fn destroy(&self, token: Uuid) {
        self.sessions.remove(&token);
    }

    #[cfg(test)]
    fn insert_expired(&self, token: Uuid, user_id: Uuid, email: &str) {
        self.sessions.insert(
            token,
            Session {
                user_id,
                email: email.to_string(),
                expires_at: Utc::now() - Duration::seconds(1),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_session_is_retrievable() {
        let store = SessionStore::new(24);
        let user_id = Uuid::new_v4();
        let token = store.create(user_id, "farmer@example.com");

        let session = store.get(token).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email, "farmer@example.com");
    }

    #[test]
    fn destroy_evicts_and_is_idempotent() {
        let store = SessionStore::new(24);
        let token = store.create(Uuid::new_v4(), "a@b.c");

        store.destroy(token);
        assert!(store.get(token).is_none());

        // Second destroy of the same token is a no-op
        store.destroy(token);
        store.destroy(Uuid::new_v4());
    }

    #[test]
    fn expired_session_reads_as_absent_and_is_reaped() {
        let store = SessionStore::new(24);
        let token = Uuid::new_v4();
        store.insert_expired(token, Uuid::new_v4(), "late@example.com");

        assert!(store.get(token).is_none());
        // Reaped on first access
        assert!(store.sessions.get(&token).is_none());
    }

    #[test]
    fn create_sweeps_abandoned_expired_sessions() {
        let store = SessionStore::new(24);
        for _ in 0..8 {
            store.insert_expired(Uuid::new_v4(), Uuid::new_v4(), "stale@example.com");
        }
        let live = store.create(Uuid::new_v4(), "live@example.com");

        // Stale entries are gone without their tokens ever coming back
        assert_eq!(store.sessions.len(), 1);
        assert!(store.get(live).is_some());
    }

    #[test]
    fn tokens_are_distinct_per_session() {
        let store = SessionStore::new(24);
        let user_id = Uuid::new_v4();
        let a = store.create(user_id, "a@b.c");
        let b = store.create(user_id, "a@b.c");
        assert_ne!(a, b);
    }
}
