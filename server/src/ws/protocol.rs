//! JSON event frames exchanged over the WebSocket.
//!
//! Every outbound frame is a text message shaped `{"event": <name>, "data": <payload>}`.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::chat::Message as ChatMessage;
use crate::presence::UserId;

/// Events the server pushes to connected sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full presence snapshot.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),
    /// Live delivery of a message addressed to this session's user.
    #[serde(rename = "newMessage")]
    NewMessage(ChatMessage),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => "getOnlineUsers",
            Self::NewMessage(_) => "newMessage",
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_ws_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                tracing::warn!(event = self.name(), error = %e, "Failed to encode event");
                None
            }
        }
    }

    /// Decode a text frame produced by [`ServerEvent::to_ws_message`].
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Handle an inbound text frame.
///
/// Messages are sent over HTTP, so sessions only listen. Anything a client
/// writes is logged and dropped.
pub fn handle_text_message(text: &str, user_id: Option<&str>) {
    tracing::debug!(
        user_id = user_id.unwrap_or("-"),
        "Ignoring inbound text frame: {}",
        text.chars().take(100).collect::<String>()
    );
}
