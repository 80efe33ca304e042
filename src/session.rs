//! Session repository
//!
//! Sessions are append-only. The only mutation is marking a session as
//! having received feedback, which happens at most once.

use crate::error::{Result, RouterError};
use crate::types::{Session, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, session: Session) -> Result<()>;

    /// Fails with `SessionNotFound` for unknown IDs
    async fn get(&self, id: SessionId) -> Result<Session>;

    /// All sessions in creation order
    async fn list(&self) -> Result<Vec<Session>>;

    /// Mark a session as rated
    ///
    /// Fails with `SessionNotFound` or `DuplicateFeedback`; the check and the
    /// write happen atomically.
    async fn attach_feedback(&self, id: SessionId, at: DateTime<Utc>) -> Result<Session>;
}

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    index: HashMap<SessionId, usize>,
}

/// In-process session store
#[derive(Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Inner>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore previously persisted sessions
    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        let index = sessions.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        Self {
            inner: RwLock::new(Inner { sessions, index }),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, session: Session) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.index.contains_key(&session.id) {
            return Err(RouterError::Internal(format!(
                "Session {} already exists",
                session.id
            )));
        }
        let position = inner.sessions.len();
        inner.index.insert(session.id, position);
        inner.sessions.push(session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(&id)
            .map(|&i| inner.sessions[i].clone())
            .ok_or(RouterError::SessionNotFound(id))
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.inner.read().await.sessions.clone())
    }

    async fn attach_feedback(&self, id: SessionId, at: DateTime<Utc>) -> Result<Session> {
        let mut inner = self.inner.write().await;
        let i = *inner.index.get(&id).ok_or(RouterError::SessionNotFound(id))?;
        let session = &mut inner.sessions[i];

        if session.feedback_received_at.is_some() {
            return Err(RouterError::DuplicateFeedback(id));
        }
        session.feedback_received_at = Some(at);
        Ok(session.clone())
    }
}
