//! Point-to-point messages: the record type, the live router and the HTTP surface.

pub mod messages;
pub mod router;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presence::UserId;

/// Message content. At least one of text or image is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    text: Option<String>,
    image: Option<String>,
}

impl MessageBody {
    /// Blank fields count as absent. Returns `None` when nothing is left.
    pub fn new(text: Option<String>, image: Option<String>) -> Option<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        let image = image.filter(|i| !i.trim().is_empty());
        if text.is_none() && image.is_none() {
            return None;
        }
        Some(Self { text, image })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// A chat message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image URL or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender_id: &str, recipient_id: &str, body: MessageBody) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            text: body.text,
            image: body.image,
            seen: false,
            created_at: Utc::now(),
        }
    }
}
