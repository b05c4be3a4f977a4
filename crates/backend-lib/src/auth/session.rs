// ============================
// chat-backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use chat_common::User;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

/// Session information
#[derive(Clone)]
struct Session {
    user: User,
    expires_at: SystemTime,
}

/// In-memory store mapping opaque session tokens to authenticated users.
/// Tokens are issued by the external account layer (and by tests); this core
/// only resolves them.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager and start its periodic cleanup task.
    pub fn new(ttl: Duration) -> Self {
        let manager = SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        };

        let manager_clone = manager.clone();
        tokio::spawn(async move {
            manager_clone.cleanup_task().await;
        });

        manager
    }

    /// Issue a new session token for a user.
    pub async fn issue(&self, user: User) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user,
            expires_at: SystemTime::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        metrics::counter!(crate::metrics::SESSION_ISSUED).increment(1);
        metrics::gauge!(crate::metrics::SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Resolve a token to its user, if the session exists and has not
    /// expired.
    pub async fn resolve(&self, token: &str) -> Option<User> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(token)?;
        (SystemTime::now() < session.expires_at).then(|| session.user.clone())
    }

    /// Revoke a session. Unknown tokens are a no-op.
    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Cleanup task that runs periodically to remove expired sessions
    async fn cleanup_task(&self) {
        let cleanup_interval = Duration::from_secs(60 * 60); // 1 hour

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let mut sessions = self.sessions.write().await;
            let now = SystemTime::now();
            let before_count = sessions.len();

            sessions.retain(|_, session| now < session.expires_at);

            let removed = before_count - sessions.len();
            if removed > 0 {
                metrics::counter!(crate::metrics::SESSION_EXPIRED).increment(removed as u64);
                metrics::gauge!(crate::metrics::SESSION_ACTIVE).set(sessions.len() as f64);
            }
        }
    }
}
