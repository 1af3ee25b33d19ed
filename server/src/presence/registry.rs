use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{SessionKey, UserId};

/// Connection registry: maps each online user to their most recent session.
///
/// A single mutex covers every operation, so `register`, `unregister` and
/// `snapshot_online_ids` never interleave. No caller holds the lock across an
/// await point or a network push.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<UserId, SessionKey>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each operation leaves the map whole, so a poisoned lock still guards
    /// consistent data.
    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, SessionKey>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `user_id` to `session`, replacing any earlier binding.
    /// The replaced session is not closed; it just stops being reachable.
    pub fn register(&self, user_id: &str, session: SessionKey) {
        let previous = self.entries().insert(user_id.to_string(), session);

        match previous {
            Some(old) if old != session => tracing::debug!(
                user_id = %user_id,
                session = %session,
                replaced = %old,
                "Registry entry replaced"
            ),
            _ => tracing::debug!(user_id = %user_id, session = %session, "Registry entry added"),
        }
    }

    /// Remove the binding for `user_id` only if it still points at `session`.
    ///
    /// A disconnect from a superseded session leaves the newer binding alone.
    /// Returns true when an entry was removed.
    pub fn unregister(&self, user_id: &str, session: SessionKey) -> bool {
        let mut entries = self.entries();
        match entries.get(user_id) {
            Some(current) if *current == session => {
                entries.remove(user_id);
                true
            }
            Some(current) => {
                tracing::debug!(
                    user_id = %user_id,
                    session = %session,
                    current = %current,
                    "Ignoring stale unregister"
                );
                false
            }
            None => false,
        }
    }

    pub fn lookup(&self, user_id: &str) -> Option<SessionKey> {
        self.entries().get(user_id).copied()
    }

    /// Point-in-time copy of the online set, sorted.
    pub fn snapshot_online_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.entries().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
