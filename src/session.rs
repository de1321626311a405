//! Per-login session state, keyed by an opaque bearer token.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{errors::ServiceError, services::users::UserProfile, AppState};

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "x-session-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    pub user: UserProfile,
    /// Order the user has asked to cancel but not yet confirmed.
    pub pending_cancel: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionContext>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(8)),
        }
    }

    /// Opens a fresh session for a user who just logged in.
    pub fn create(&self, user: UserProfile) -> SessionContext {
        let now = Utc::now();
        let context = SessionContext {
            token: generate_token(),
            user,
            pending_cancel: None,
            created_at: now,
            last_seen: now,
        };
        self.sessions
            .insert(context.token.clone(), context.clone());
        info!(user_id = %context.user.id, "Session opened");
        context
    }

    /// Resolves a token, dropping it if it has been idle longer than the TTL.
    pub fn get(&self, token: &str) -> Option<SessionContext> {
        let now = Utc::now();
        {
            let mut entry = self.sessions.get_mut(token)?;
            if now - entry.last_seen <= self.ttl {
                entry.last_seen = now;
                return Some(entry.value().clone());
            }
        }
        debug!("Session expired");
        self.sessions.remove(token);
        None
    }

    pub fn remove(&self, token: &str) -> Option<SessionContext> {
        self.sessions.remove(token).map(|(_, context)| context)
    }

    pub fn set_pending_cancel(&self, token: &str, order_id: Option<Uuid>) -> Result<(), ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(token)
            .ok_or_else(|| ServiceError::Unauthorized("Session expired".to_string()))?;
        entry.pending_cancel = order_id;
        Ok(())
    }

    /// Clears the pending cancellation only if it targets `order_id`.
    /// Returns whether anything was cleared.
    pub fn clear_pending_cancel(&self, token: &str, order_id: Uuid) -> Result<bool, ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(token)
            .ok_or_else(|| ServiceError::Unauthorized("Session expired".to_string()))?;
        if entry.pending_cancel == Some(order_id) {
            entry.pending_cancel = None;
            return Ok(true);
        }
        Ok(false)
    }

    /// Removes idle sessions and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut purged = 0;
        self.sessions.retain(|_, context| {
            let keep = context.last_seen >= cutoff;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Extractor for the caller's session; rejects with 401 when missing or unknown.
#[derive(Debug, Clone)]
pub struct Session(pub SessionContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("Login required".to_string()))?;

        state
            .sessions
            .get(token)
            .map(Session)
            .ok_or_else(|| ServiceError::Unauthorized("Session expired or unknown".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            full_name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "9000000000".into(),
            role: UserRole::Customer,
        }
    }

    #[test]
    fn sessions_are_isolated_per_token() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let asha = store.create(profile("Asha"));
        let ravi = store.create(profile("Ravi"));
        assert_ne!(asha.token, ravi.token);

        let order_id = Uuid::new_v4();
        store.set_pending_cancel(&asha.token, Some(order_id)).unwrap();
        assert_eq!(store.get(&asha.token).unwrap().pending_cancel, Some(order_id));
        assert_eq!(store.get(&ravi.token).unwrap().pending_cancel, None);
    }

    #[test]
    fn clearing_a_different_order_keeps_the_pending_target() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.create(profile("Asha"));
        let order_id = Uuid::new_v4();
        store.set_pending_cancel(&session.token, Some(order_id)).unwrap();

        assert!(!store.clear_pending_cancel(&session.token, Uuid::new_v4()).unwrap());
        assert_eq!(store.get(&session.token).unwrap().pending_cancel, Some(order_id));
        assert!(store.clear_pending_cancel(&session.token, order_id).unwrap());
        assert_eq!(store.get(&session.token).unwrap().pending_cancel, None);
    }

    #[test]
    fn logout_forgets_the_token() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.create(profile("Asha"));
        assert!(store.remove(&session.token).is_some());
        assert!(store.get(&session.token).is_none());
        assert!(store.set_pending_cancel(&session.token, None).is_err());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create(profile("Asha"));
        store
            .sessions
            .get_mut(&session.token)
            .unwrap()
            .last_seen = Utc::now() - chrono::Duration::minutes(5);
        assert!(store.get(&session.token).is_none());
        assert!(store.is_empty());

        let stale = store.create(profile("Ravi"));
        store.sessions.get_mut(&stale.token).unwrap().last_seen =
            Utc::now() - chrono::Duration::minutes(5);
        store.create(profile("Mina"));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn purge_counts_only_removed_sessions_while_logins_continue() {
        let store = SessionStore::new(Duration::from_secs(60));
        for name in ["Ravi", "Mina", "Kiran"] {
            let stale = store.create(profile(name));
            store.sessions.get_mut(&stale.token).unwrap().last_seen =
                Utc::now() - chrono::Duration::minutes(5);
        }

        let purged = std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..2_000 {
                    store.create(profile("Asha"));
                }
            });
            let mut purged = 0;
            for _ in 0..200 {
                purged += store.purge_expired();
            }
            purged
        });

        assert_eq!(purged, 3);
        assert_eq!(store.len(), 2_000);
    }

    #[test]
    fn tokens_are_url_safe() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
