//! SQLite storage implementation
//!
//! This module provides an embedded-database implementation of the
//! `PageStore` trait. A submitted batch is applied inside one transaction.
//! rusqlite calls block, so every trait method runs its statements on the
//! blocking thread pool rather than on a runtime worker.

use crate::pages::PageHash;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StoreError, StoreResult};
use crate::storage::{StagedWrite, WriteBatch};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    /// Runs `task` against the connection on the blocking thread pool
    async fn with_connection<T, F>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_connection(&conn)?;
            task(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("sqlite task failed: {}", e)))?
    }

    /// Returns the members of the set stored under `key`
    pub fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT member FROM set_members WHERE key = ?1 ORDER BY member")?;
        let members = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(members)
    }

    /// Returns the pending entries of `queue`, oldest first
    pub fn queue(&self, queue: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT value FROM queue_entries WHERE queue = ?1 ORDER BY id")?;
        let values = stmt
            .query_map(params![queue], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    fn read_hash(conn: &Connection, key: &str) -> rusqlite::Result<PageHash> {
        let mut stmt = conn.prepare_cached("SELECT field, value FROM hash_fields WHERE key = ?1")?;
        let fields = stmt
            .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<PageHash, _>>()?;
        Ok(fields)
    }

    fn apply_writes(conn: &mut Connection, writes: Vec<StagedWrite>) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        {
            let mut set_field = tx.prepare(
                "INSERT INTO hash_fields (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            )?;
            let mut add_member =
                tx.prepare("INSERT OR IGNORE INTO set_members (key, member) VALUES (?1, ?2)")?;

            for write in writes {
                match write {
                    StagedWrite::Hash { key, fields } => {
                        for (field, value) in fields {
                            set_field.execute(params![key, field, value])?;
                        }
                    }
                    StagedWrite::SetMembers { key, members } => {
                        for member in members {
                            add_member.execute(params![key, member])?;
                        }
                    }
                }
            }
        }
        tx.commit()
    }

    fn pop_now(conn: &Connection, queue: &str) -> StoreResult<Option<String>> {
        let entry: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, value FROM queue_entries WHERE queue = ?1 ORDER BY id LIMIT 1",
                params![queue],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, _)) = &entry {
            conn.execute("DELETE FROM queue_entries WHERE id = ?1", params![id])?;
        }

        Ok(entry.map(|(_, value)| value))
    }
}

fn lock_connection(conn: &Mutex<Connection>) -> StoreResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
}

#[async_trait]
impl PageStore for SqliteStore {
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM hash_fields WHERE substr(key, 1, length(?1)) = ?1
                 UNION
                 SELECT key FROM set_members WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )?;
            let keys = stmt
                .query_map(params![prefix], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
        .await
    }

    async fn batch_get_hash(&self, keys: &[String]) -> StoreResult<Vec<PageHash>> {
        let keys = keys.to_vec();
        self.with_connection(move |conn| {
            keys.iter()
                .map(|key| Self::read_hash(conn, key))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Batch {
                    operations: keys.len(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn submit(&self, batch: WriteBatch) -> StoreResult<()> {
        let operations = batch.len();
        self.with_connection(move |conn| {
            Self::apply_writes(conn, batch.into_writes()).map_err(|e| StoreError::Batch {
                operations,
                reason: e.to_string(),
            })
        })
        .await
    }

    async fn push(&self, queue: &str, value: &str) -> StoreResult<()> {
        let (queue, value) = (queue.to_string(), value.to_string());
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO queue_entries (queue, value, pushed_at) VALUES (?1, ?2, ?3)",
                params![queue, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn wait_pop(&self, queue: &str, timeout: Duration) -> StoreResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let name = queue.to_string();
            if let Some(value) = self
                .with_connection(move |conn| Self::pop_now(conn, &name))
                .await?
            {
                return Ok(Some(value));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
