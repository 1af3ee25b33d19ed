use std::sync::Arc;

use super::store::{MessageStore, StoreError};
use super::{Message, MessageBody};
use crate::presence::registry::ConnectionRegistry;
use crate::ws::broadcast::send_to_session;
use crate::ws::protocol::ServerEvent;
use crate::ws::SessionTable;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("failed to store message: {0}")]
    Persistence(#[from] StoreError),
}

/// Outcome of a stored message.
#[derive(Debug, Clone)]
pub struct Routed {
    pub message: Message,
    /// Whether a live copy was queued on the recipient's session.
    pub delivered: bool,
}

/// Stores each message and pushes a live copy to the recipient if they are online.
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
    store: Arc<dyn MessageStore>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<SessionTable>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
        }
    }

    /// Store the message once, then attempt one live push whatever the store said.
    ///
    /// Only a storage failure is reported. An offline recipient or a failed
    /// push is a normal outcome and shows up as `delivered == false`.
    pub async fn route(
        &self,
        sender_id: &str,
        recipient_id: &str,
        body: MessageBody,
    ) -> Result<Routed, RouteError> {
        let message = Message::new(sender_id, recipient_id, body);

        let stored = self.store.save(&message).await;
        let delivered = self.deliver_live(&message);

        match stored {
            Ok(()) => {
                tracing::debug!(
                    message_id = %message.id,
                    sender_id = %sender_id,
                    recipient_id = %recipient_id,
                    delivered,
                    "Message routed"
                );
                Ok(Routed { message, delivered })
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message.id,
                    sender_id = %sender_id,
                    recipient_id = %recipient_id,
                    error = %e,
                    "Failed to store message"
                );
                Err(e.into())
            }
        }
    }

    /// Best-effort push to the recipient's current session.
    pub fn deliver_live(&self, message: &Message) -> bool {
        let Some(session) = self.registry.lookup(&message.recipient_id) else {
            return false;
        };
        send_to_session(
            &self.sessions,
            &session,
            &ServerEvent::NewMessage(message.clone()),
        )
    }
}
