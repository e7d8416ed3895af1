//! Session tokens (transport-agnostic).
//!
//! A session maps an opaque bearer token to an account for a bounded time
//! window. Signing, cookies and headers belong to whatever transport sits in
//! front of the wallet.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use tallypay_core::AccountId;

/// Opaque bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a token speaks for, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("unknown session token")]
    Unknown,
}

/// Deterministically validate session claims against `now`.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), SessionError> {
    if claims.expires_at <= claims.issued_at {
        return Err(SessionError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(SessionError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(SessionError::Expired);
    }
    Ok(())
}

/// Issues and checks session tokens.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, account_id: AccountId, now: DateTime<Utc>) -> SessionToken;

    fn authenticate(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, SessionError>;

    fn revoke(&self, token: &SessionToken);
}

/// Process-local session table with random tokens.
#[derive(Debug)]
pub struct InMemorySessionIssuer {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, SessionClaims>>,
}

impl InMemorySessionIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn fresh_token() -> SessionToken {
        SessionToken(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }
}

impl SessionIssuer for InMemorySessionIssuer {
    fn issue(&self, account_id: AccountId, now: DateTime<Utc>) -> SessionToken {
        let token = Self::fresh_token();
        let claims = SessionClaims {
            account_id,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        // The table holds complete entries only; a poisoned lock is still consistent.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        let swept = before - sessions.len();
        sessions.insert(token.clone(), claims);
        drop(sessions);

        debug!(account_id = %account_id, swept, "session issued");
        token
    }

    fn authenticate(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, SessionError> {
        let claims = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(SessionError::Unknown)?;

        if let Err(e) = validate_claims(&claims, now) {
            if e == SessionError::Expired {
                self.revoke(token);
            }
            return Err(e);
        }
        Ok(claims)
    }

    fn revoke(&self, token: &SessionToken) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}
