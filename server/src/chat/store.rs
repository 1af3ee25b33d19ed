//! Durable message storage.
//!
//! The router only needs `save`; the read side backs the history endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Message;
use crate::db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message.
    async fn save(&self, message: &Message) -> Result<(), StoreError>;

    /// Every message exchanged between two users, oldest first.
    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError>;

    /// Mark everything `sender_id` sent to `recipient_id` as seen.
    /// Returns how many messages changed.
    async fn mark_conversation_seen(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<usize, StoreError>;

    /// Mark one message as seen, only if `recipient_id` is its recipient.
    /// Returns false when no such message exists.
    async fn mark_seen(&self, message_id: &str, recipient_id: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed store. All queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteMessageStore {
    db: DbPool,
}

impl SqliteMessageStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&conn).map_err(StoreError::from)
        })
        .await?
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn save(&self, message: &Message) -> Result<(), StoreError> {
        let message = message.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, text, image, seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id,
                    message.sender_id,
                    message.recipient_id,
                    message.text,
                    message.image,
                    message.seen,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError> {
        let user_a = user_a.to_string();
        let user_b = user_b.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, recipient_id, text, image, seen, created_at
                 FROM messages
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY created_at ASC, id ASC",
            )?;
            let messages = stmt
                .query_map(rusqlite::params![user_a, user_b], |row| {
                    Ok(Message {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        text: row.get(3)?,
                        image: row.get(4)?,
                        seen: row.get(5)?,
                        created_at: row.get::<_, DateTime<Utc>>(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
    }

    async fn mark_conversation_seen(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<usize, StoreError> {
        let sender_id = sender_id.to_string();
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE messages SET seen = 1
                 WHERE sender_id = ?1 AND recipient_id = ?2 AND seen = 0",
                rusqlite::params![sender_id, recipient_id],
            )
        })
        .await
    }

    async fn mark_seen(&self, message_id: &str, recipient_id: &str) -> Result<bool, StoreError> {
        let message_id = message_id.to_string();
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET seen = 1 WHERE id = ?1 AND recipient_id = ?2",
                rusqlite::params![message_id, recipient_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageBody;

    fn store() -> SqliteMessageStore {
        SqliteMessageStore::new(crate::db::init_in_memory().unwrap())
    }

    fn text(s: &str) -> MessageBody {
        MessageBody::new(Some(s.to_string()), None).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_read_conversation() {
        let store = store();
        let first = Message::new("bob", "alice", text("hi alice"));
        let second = Message::new("alice", "bob", text("hi bob"));
        let other = Message::new("bob", "carol", text("hi carol"));

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        store.save(&other).await.unwrap();

        let history = store.conversation("alice", "bob").await.unwrap();
        assert_eq!(history, vec![first, second]);
    }

    #[tokio::test]
    async fn test_image_only_message_round_trips() {
        let store = store();
        let body = MessageBody::new(None, Some("https://img.example/cat.png".into())).unwrap();
        let message = Message::new("bob", "alice", body);
        store.save(&message).await.unwrap();

        let history = store.conversation("bob", "alice").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, None);
        assert_eq!(history[0].image.as_deref(), Some("https://img.example/cat.png"));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = store();
        let message = Message::new("bob", "alice", text("once"));
        store.save(&message).await.unwrap();

        let err = store.save(&message).await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_mark_seen_only_by_recipient() {
        let store = store();
        let message = Message::new("bob", "alice", text("read me"));
        store.save(&message).await.unwrap();

        assert!(!store.mark_seen(&message.id, "bob").await.unwrap());
        assert!(store.mark_seen(&message.id, "alice").await.unwrap());
        assert!(!store.mark_seen("missing", "alice").await.unwrap());

        let history = store.conversation("alice", "bob").await.unwrap();
        assert!(history[0].seen);
    }

    #[tokio::test]
    async fn test_mark_conversation_seen_is_directional() {
        let store = store();
        store.save(&Message::new("bob", "alice", text("one"))).await.unwrap();
        store.save(&Message::new("bob", "alice", text("two"))).await.unwrap();
        store.save(&Message::new("alice", "bob", text("reply"))).await.unwrap();

        assert_eq!(store.mark_conversation_seen("bob", "alice").await.unwrap(), 2);
        assert_eq!(store.mark_conversation_seen("bob", "alice").await.unwrap(), 0);

        let history = store.conversation("alice", "bob").await.unwrap();
        let unseen: Vec<_> = history.iter().filter(|m| !m.seen).collect();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].sender_id, "alice");
    }
}
