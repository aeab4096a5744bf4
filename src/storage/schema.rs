//! Database schema definitions
//!
//! The SQLite backend mirrors the key-value layout used with Redis: hash
//! records, set records and named FIFO queues.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Hash records (one row per field)
CREATE TABLE IF NOT EXISTS hash_fields (
    key TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);

-- Set records (one row per member)
CREATE TABLE IF NOT EXISTS set_members (
    key TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (key, member)
);

-- Work queues consumed by the indexing stage
CREATE TABLE IF NOT EXISTS queue_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    queue TEXT NOT NULL,
    value TEXT NOT NULL,
    pushed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_entries_queue ON queue_entries(queue, id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
