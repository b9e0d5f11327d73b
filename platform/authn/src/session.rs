use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use entity::SessionUser;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
pub struct Session<W> {
    pub id: Uuid,
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub workspace: W,
}

impl<W> Session<W> {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory sessions, each carrying a per-session workspace `W`.
///
/// Ending or expiring a session drops its workspace.
#[derive(Debug)]
pub struct SessionStore<W> {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Session<W>>>,
}

impl<W: Default> SessionStore<W> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn start(&self, user: SessionUser) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let session = Session {
            id,
            user,
            created_at: now,
            expires_at: now + self.ttl,
            workspace: W::default(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| !existing.expired(now));
        tracing::info!(session = %id, user = %session.user.name, role = session.user.role.as_str(), "session started");
        sessions.insert(id, session);
        id
    }

    /// The signed-in user, or `None` when the session is unknown or expired.
    pub async fn user(&self, id: Uuid) -> Option<SessionUser> {
        self.with_session(id, |session| session.user.clone()).await
    }

    pub async fn with_workspace<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&SessionUser, &mut W) -> R,
    ) -> Option<R> {
        self.with_session(id, |session| f(&session.user, &mut session.workspace))
            .await
    }

    async fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session<W>) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        if sessions.get(&id)?.expired(now) {
            sessions.remove(&id);
            tracing::debug!(session = %id, "session expired");
            return None;
        }
        sessions.get_mut(&id).map(f)
    }

    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
