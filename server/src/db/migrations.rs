use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking, no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: Direct messages

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    text TEXT,
    image TEXT,
    seen INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    CHECK (text IS NOT NULL OR image IS NOT NULL)
);

CREATE INDEX idx_messages_pair ON messages(sender_id, recipient_id, created_at);
CREATE INDEX idx_messages_recipient_unseen ON messages(recipient_id, seen);
",
    )])
}
