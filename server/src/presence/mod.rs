//! Presence-and-delivery core: who is online and which session reaches them.
//!
//! The [`registry::ConnectionRegistry`] is the only shared mutable state. The
//! [`lifecycle::SessionLifecycle`] drives it from transport connect/disconnect
//! events and asks a [`broadcaster::PresenceBroadcaster`] to announce every
//! change to all connected sessions.

pub mod broadcaster;
pub mod lifecycle;
pub mod registry;
pub mod routes;

use std::fmt;
use uuid::Uuid;

/// Opaque user identifier issued by the external auth system.
pub type UserId = String;

/// Lookup key for one live transport session.
/// Minted by the transport layer; the core never sees socket internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(Uuid);

impl SessionKey {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
