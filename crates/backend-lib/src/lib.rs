// ============================
// chat-backend-lib/src/lib.rs
// ============================
//! Core functionality for the chat WebSocket server: room registry,
//! durable message log, broadcast hub and the per-connection protocol loop.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod store;
pub mod ws_router;

use std::sync::Arc;

use crate::auth::{AuthService, SessionAuth, SessionManager};
use crate::config::Settings;
use crate::hub::BroadcastHub;
use crate::registry::RoomRegistry;
use crate::store::MessageStore;

/// Application state shared across all connections
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session manager backing the default auth service
    pub sessions: Arc<SessionManager>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Room catalog
    pub registry: Arc<RoomRegistry>,
    /// Message log store
    pub store: Arc<dyn MessageStore>,
    /// Broadcast hub
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Create a new application state around the given store.
    pub fn new(store: Arc<dyn MessageStore>, settings: Settings) -> Self {
        let sessions = Arc::new(SessionManager::new(settings.session_ttl()));
        let auth = Arc::new(SessionAuth::new(sessions.clone()));

        Self {
            auth,
            sessions,
            settings: Arc::new(settings),
            registry: Arc::new(RoomRegistry::default()),
            store,
            hub: Arc::new(BroadcastHub::new()),
        }
    }

    /// Replace the auth service (used when auth is provided externally).
    pub fn with_auth(mut self, auth: Arc<dyn AuthService>) -> Self {
        self.auth = auth;
        self
    }
}
