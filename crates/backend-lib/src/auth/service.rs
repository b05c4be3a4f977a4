// ============================
// chat-backend-lib/src/auth/service.rs
// ============================
use std::sync::Arc;

use async_trait::async_trait;
use chat_common::User;

use super::SessionManager;
use crate::error::ChatError;

/// Contract consumed from the external authentication layer: resolve an
/// opaque session credential to a user identity.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve `token` to the authenticated user, or fail with
    /// [`ChatError::AuthFailure`].
    async fn authenticate(&self, token: &str) -> Result<User, ChatError>;
}

/// Default implementation backed by the in-memory [`SessionManager`].
pub struct SessionAuth {
    sessions: Arc<SessionManager>,
}

impl SessionAuth {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl AuthService for SessionAuth {
    async fn authenticate(&self, token: &str) -> Result<User, ChatError> {
        self.sessions
            .resolve(token)
            .await
            .ok_or(ChatError::AuthFailure)
    }
}
