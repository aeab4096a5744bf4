//! Redis storage implementation
//!
//! Pages are Redis hashes, link graphs and per-page image lists are Redis
//! sets, and the indexer queues are Redis lists fed with `LPUSH` (consumers
//! `BRPOP` from the other end).

use crate::pages::PageHash;
use crate::storage::traits::{PageStore, StoreError, StoreResult};
use crate::storage::{StagedWrite, WriteBatch};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis storage backend
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connects to the server at `url` and verifies it answers `PING`
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Connected to Redis at {} ({})", url, pong);

        Ok(Self { conn })
    }
}

#[async_trait]
impl PageStore for RedisStore {
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(keys)
    }

    async fn batch_get_hash(&self, keys: &[String]) -> StoreResult<Vec<PageHash>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }

        let mut conn = self.conn.clone();
        let hashes: Vec<PageHash> =
            pipe.query_async(&mut conn)
                .await
                .map_err(|e| StoreError::Batch {
                    operations: keys.len(),
                    reason: e.to_string(),
                })?;
        Ok(hashes)
    }

    async fn submit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let operations = batch.len();
        let mut pipe = redis::pipe();
        for write in batch.writes() {
            match write {
                StagedWrite::Hash { key, fields } => {
                    let fields: Vec<(&str, &str)> = fields
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str()))
                        .collect();
                    pipe.hset_multiple(key, &fields[..]).ignore();
                }
                StagedWrite::SetMembers { key, members } => {
                    pipe.sadd(key, members).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Batch {
                operations,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn push(&self, queue: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(queue, value).await?;
        Ok(())
    }

    async fn wait_pop(&self, queue: &str, timeout: Duration) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(queue, timeout.as_secs_f64()).await?;
        Ok(popped.map(|(_, value)| value))
    }
}
