pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use axum::extract::ws::Message;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::presence::SessionKey;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Every live WebSocket session, registered or not, keyed by session.
///
/// This is the transport's own table and the fan-out surface for broadcasts.
/// Which user a session belongs to lives in the presence registry, not here.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: DashMap<SessionKey, ConnectionSender>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: SessionKey, sender: ConnectionSender) {
        self.sessions.insert(session, sender);
    }

    pub fn remove(&self, session: &SessionKey) -> Option<ConnectionSender> {
        self.sessions.remove(session).map(|(_, sender)| sender)
    }

    pub fn contains(&self, session: &SessionKey) -> bool {
        self.sessions.contains_key(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Queue `msg` on one session. Returns false if the session is unknown
    /// or its writer has already gone away.
    pub fn push(&self, session: &SessionKey, msg: Message) -> bool {
        match self.sessions.get(session) {
            Some(sender) => sender.send(msg).is_ok(),
            None => false,
        }
    }

    /// Queue `msg` on every session and return how many accepted it.
    /// A dead session is skipped; it never stops delivery to the rest.
    pub fn push_all(&self, msg: &Message) -> usize {
        let mut delivered = 0;
        for entry in self.sessions.iter() {
            if entry.value().send(msg.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(session = %entry.key(), "Skipping closed session during fan-out");
            }
        }
        delivered
    }
}

/// Server-side keepalive for each WebSocket session.
#[derive(Debug, Clone, Copy)]
pub struct Keepalive {
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// How long to wait for a pong before closing the session.
    pub pong_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}
