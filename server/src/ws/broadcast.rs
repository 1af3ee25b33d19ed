use super::protocol::ServerEvent;
use super::SessionTable;
use crate::presence::SessionKey;

/// Broadcast an event to every connected session.
/// Returns the number of sessions the event was queued on.
pub fn broadcast_to_all(sessions: &SessionTable, event: &ServerEvent) -> usize {
    match event.to_ws_message() {
        Some(msg) => sessions.push_all(&msg),
        None => 0,
    }
}

/// Send an event to a single session.
/// Returns true if it was queued on a live session.
pub fn send_to_session(sessions: &SessionTable, session: &SessionKey, event: &ServerEvent) -> bool {
    match event.to_ws_message() {
        Some(msg) => sessions.push(session, msg),
        None => false,
    }
}
