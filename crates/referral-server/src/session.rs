//! Session tokens and caller resolution.
//!
//! A successful login issues a random 256-bit token bound to the doctor's id.
//! The token travels in the `session` cookie (or an `Authorization: Bearer`
//! header) and is resolved to an explicit [`DoctorId`] at the start of every
//! authenticated handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::debug;

use referral_shared::constants::SESSION_COOKIE;
use referral_shared::DoctorId;

use crate::error::ServerError;

#[derive(Debug, Clone)]
struct Session {
    doctor_id: DoctorId,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-memory token -> doctor map.  Sessions do not survive a restart.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Start a session for `doctor_id` and return its token.
    pub async fn create(&self, doctor_id: DoctorId) -> String {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let session = Session {
            doctor_id,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);

        debug!(doctor = %doctor_id, "session created");
        token
    }

    /// Resolve a token to its doctor, ignoring expired sessions.
    pub async fn resolve(&self, token: &str) -> Option<DoctorId> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| s.is_live(Utc::now()))
            .map(|s| s.doctor_id)
    }

    /// End a session.  Returns `true` if the token was known.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop expired sessions.  Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, s| s.is_live(now));
        before - sessions.len()
    }

    /// Resolve the caller of a request, or fail with 401.
    pub async fn caller(&self, headers: &HeaderMap) -> Result<DoctorId, ServerError> {
        let token = token_from_headers(headers).ok_or(ServerError::Unauthenticated(
            "Please log in to access this page",
        ))?;
        self.resolve(&token)
            .await
            .ok_or(ServerError::Unauthenticated("Session expired, please log in again"))
    }

    /// `Set-Cookie` value carrying a new session token.
    pub fn cookie(&self, token: &str) -> HeaderValue {
        cookie_header(token, self.ttl_secs())
    }

    /// `Set-Cookie` value clearing the session cookie.
    pub fn clearing_cookie(&self) -> HeaderValue {
        cookie_header("", 0)
    }
}

fn cookie_header(token: &str, max_age: i64) -> HeaderValue {
    let value = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    // Tokens are hex, so the value is always a valid header.
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Extract the session token from the cookie, then from a bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=') {
                if name == SESSION_COOKIE && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_resolve_revoke() {
        let store = SessionStore::new(60);
        let token = store.create(DoctorId(3)).await;
        assert_eq!(token.len(), 64);
        assert_eq!(store.resolve(&token).await, Some(DoctorId(3)));

        assert!(store.revoke(&token).await);
        assert_eq!(store.resolve(&token).await, None);
        assert!(!store.revoke(&token).await);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_ignored_and_purged() {
        let store = SessionStore::new(0);
        let token = store.create(DoctorId(1)).await;
        assert_eq!(store.resolve(&token).await, None);
        assert_eq!(store.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_caller_from_cookie_or_bearer() {
        let store = SessionStore::new(60);
        let token = store.create(DoctorId(9)).await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; session={token}")).unwrap(),
        );
        assert_eq!(store.caller(&headers).await.unwrap(), DoctorId(9));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(store.caller(&headers).await.unwrap(), DoctorId(9));
    }

    #[tokio::test]
    async fn test_missing_or_unknown_token() {
        let store = SessionStore::new(60);
        assert!(matches!(
            store.caller(&HeaderMap::new()).await,
            Err(ServerError::Unauthenticated(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=deadbeef"));
        assert!(matches!(
            store.caller(&headers).await,
            Err(ServerError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_cookie_shape() {
        let store = SessionStore::new(120);
        let cookie = store.cookie("abc");
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=120"
        );
        assert!(store.clearing_cookie().to_str().unwrap().contains("Max-Age=0"));
    }
}
