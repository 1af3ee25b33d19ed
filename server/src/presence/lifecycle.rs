use dashmap::DashMap;
use std::sync::Arc;

use super::broadcaster::PresenceBroadcaster;
use super::registry::ConnectionRegistry;
use super::{SessionKey, UserId};
use crate::ws::{ConnectionSender, SessionTable};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Open, but carrying no user identity. Receives presence, never appears in it.
    Connecting,
    /// Bound to a user in the registry (unless a newer session replaced it).
    Registered(UserId),
    /// Terminal.
    Closed,
}

/// Binds transport sessions to users on connect and unbinds them on disconnect,
/// announcing presence after every registry change.
pub struct SessionLifecycle {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
    broadcaster: Arc<dyn PresenceBroadcaster>,
    /// Open sessions and the user each one registered as, if any.
    open: DashMap<SessionKey, Option<UserId>>,
}

impl SessionLifecycle {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<SessionTable>,
        broadcaster: Arc<dyn PresenceBroadcaster>,
    ) -> Self {
        Self {
            registry,
            sessions,
            broadcaster,
            open: DashMap::new(),
        }
    }

    /// Accept a new transport session.
    ///
    /// With a non-empty `user_id` the session is registered and presence is
    /// announced to everyone, this session included. Without one the session
    /// stays unregistered and only it is sent the current online set.
    pub fn open(&self, user_id: Option<&str>, sender: ConnectionSender) -> SessionKey {
        let session = SessionKey::new();
        let user_id = user_id.filter(|id| !id.is_empty()).map(str::to_string);

        self.sessions.insert(session, sender);
        self.open.insert(session, user_id.clone());

        match user_id {
            Some(user_id) => {
                self.registry.register(&user_id, session);
                tracing::info!(user_id = %user_id, session = %session, "User connected");
                self.broadcaster.announce();
            }
            None => {
                tracing::info!(session = %session, "Anonymous session connected, not registered");
                self.broadcaster.announce_to(&session);
            }
        }

        session
    }

    /// Tear down a session. Returns false if it was already closed.
    pub fn close(&self, session: SessionKey) -> bool {
        let Some((_, user_id)) = self.open.remove(&session) else {
            return false;
        };
        self.sessions.remove(&session);

        match user_id {
            Some(user_id) => {
                let removed = self.registry.unregister(&user_id, session);
                tracing::info!(
                    user_id = %user_id,
                    session = %session,
                    superseded = !removed,
                    "User disconnected"
                );
                self.broadcaster.announce();
            }
            None => {
                tracing::info!(session = %session, "Anonymous session disconnected");
            }
        }

        true
    }

    pub fn state(&self, session: &SessionKey) -> SessionState {
        match self.open.get(session) {
            Some(entry) => match entry.value() {
                Some(user_id) => SessionState::Registered(user_id.clone()),
                None => SessionState::Connecting,
            },
            None => SessionState::Closed,
        }
    }

    /// Number of open sessions, registered or not.
    pub fn open_sessions(&self) -> usize {
        self.open.len()
    }
}
