use std::sync::Arc;

use super::registry::ConnectionRegistry;
use super::SessionKey;
use crate::ws::broadcast::{broadcast_to_all, send_to_session};
use crate::ws::protocol::ServerEvent;
use crate::ws::SessionTable;

/// Announces presence changes to connected sessions.
pub trait PresenceBroadcaster: Send + Sync {
    /// Push the current online set to every connected session.
    /// Returns how many sessions it was queued on.
    fn announce(&self) -> usize;

    /// Push the current online set to a single session.
    fn announce_to(&self, session: &SessionKey) -> bool;
}

/// Sends the whole online set on every change.
pub struct SnapshotBroadcaster {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
}

impl SnapshotBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, sessions: Arc<SessionTable>) -> Self {
        Self { registry, sessions }
    }
}

impl PresenceBroadcaster for SnapshotBroadcaster {
    fn announce(&self) -> usize {
        // The registry lock is released before any push.
        let online = self.registry.snapshot_online_ids();
        let online_count = online.len();
        let delivered = broadcast_to_all(&self.sessions, &ServerEvent::OnlineUsers(online));

        tracing::debug!(
            online = online_count,
            sessions = delivered,
            "Presence announced"
        );
        delivered
    }

    fn announce_to(&self, session: &SessionKey) -> bool {
        let online = self.registry.snapshot_online_ids();
        send_to_session(&self.sessions, session, &ServerEvent::OnlineUsers(online))
    }
}
