//! Database schema

/// SQL schema for initialization
///
/// Column names follow the intake spreadsheet the service replaced:
/// `conversation_state`, `plz`, `kwh`.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    phone TEXT PRIMARY KEY,
    conversation_state TEXT NOT NULL DEFAULT '',
    plz TEXT,
    kwh REAL,
    photo_received BOOLEAN,
    opted_out INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_state ON conversations(conversation_state);
";

/// Adds the opt-out marker to databases created before it existed
pub const MIGRATION_OPTED_OUT: &str =
    "ALTER TABLE conversations ADD COLUMN opted_out INTEGER NOT NULL DEFAULT 0";

/// How long a writer waits on a locked database file before failing
pub const BUSY_TIMEOUT_MS: u64 = 5_000;
