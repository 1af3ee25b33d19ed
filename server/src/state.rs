use std::sync::Arc;

use crate::chat::router::MessageRouter;
use crate::chat::store::MessageStore;
use crate::presence::broadcaster::SnapshotBroadcaster;
use crate::presence::lifecycle::SessionLifecycle;
use crate::presence::registry::ConnectionRegistry;
use crate::ws::{Keepalive, SessionTable};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// JWT signing secret shared with the auth service
    pub jwt_secret: Vec<u8>,
    /// Online users and the session that reaches each one
    pub registry: Arc<ConnectionRegistry>,
    /// Every open WebSocket session
    pub sessions: Arc<SessionTable>,
    /// Connect/disconnect handling
    pub lifecycle: Arc<SessionLifecycle>,
    /// Store-then-push message delivery
    pub router: Arc<MessageRouter>,
    /// Message persistence
    pub store: Arc<dyn MessageStore>,
    /// WebSocket ping/pong settings
    pub keepalive: Keepalive,
}

impl AppState {
    /// Wire up a fresh, empty registry around the given store.
    pub fn new(store: Arc<dyn MessageStore>, jwt_secret: Vec<u8>, keepalive: Keepalive) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionTable::new());
        let broadcaster = Arc::new(SnapshotBroadcaster::new(registry.clone(), sessions.clone()));
        let lifecycle = Arc::new(SessionLifecycle::new(
            registry.clone(),
            sessions.clone(),
            broadcaster,
        ));
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            sessions.clone(),
            store.clone(),
        ));

        Self {
            jwt_secret,
            registry,
            sessions,
            lifecycle,
            router,
            store,
            keepalive,
        }
    }
}
