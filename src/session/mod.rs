//! Authenticated session storage.
//!
//! Sessions are issued after a successful SSO login and referenced by an
//! opaque cookie value. The in-memory store covers single-node deployments;
//! multi-node deployments put a shared store behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// An authenticated browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    /// Tenant whose connection authenticated this session.
    pub tenant: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> SessionResult<()>;

    /// Fetch a live session. Expired sessions are removed and reported as
    /// `SessionError::Expired`.
    async fn get(&self, id: Uuid) -> SessionResult<Session>;

    async fn delete(&self, id: Uuid) -> SessionResult<()>;
}

/// DashMap-backed session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: Session) -> SessionResult<()> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> SessionResult<Session> {
        let session = self
            .sessions
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(SessionError::NotFound)?;
        if session.is_expired() {
            self.sessions.remove(&id);
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    async fn delete(&self, id: Uuid) -> SessionResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }
}

/// Build a session for `user_id` with the configured lifetime.
pub fn new_session(user_id: Uuid, email: &str, tenant: &str, duration_secs: u64) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        user_id,
        email: email.to_string(),
        tenant: tenant.to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(duration_secs as i64),
    }
}
