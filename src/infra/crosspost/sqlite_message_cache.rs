// SQLite-backed cache of recent messages for crosspost comparison.
//
// Table:
// - message_cache: one row per message id, swept periodically

use crate::core::crosspost::{CachedMessage, CrosspostError, MessageCache};
use crate::infra::database::{from_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteMessageCache {
    pool: Pool<Sqlite>,
}

impl SqliteMessageCache {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), CrosspostError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_cache (
                message_id INTEGER PRIMARY KEY,
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_message_cache_guild_user
                ON message_cache(guild_id, user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_message_cache_created
                ON message_cache(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl MessageCache for SqliteMessageCache {
    async fn put(&self, message: CachedMessage) -> Result<(), CrosspostError> {
        sqlx::query(
            r#"
            INSERT INTO message_cache (message_id, guild_id, channel_id, user_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO UPDATE SET
                guild_id = excluded.guild_id,
                channel_id = excluded.channel_id,
                user_id = excluded.user_id,
                content = excluded.content,
                created_at = excluded.created_at
            "#,
        )
        .bind(message.message_id as i64)
        .bind(message.guild_id as i64)
        .bind(message.channel_id as i64)
        .bind(message.user_id as i64)
        .bind(&message.content)
        .bind(to_millis(message.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn recent(
        &self,
        guild_id: u64,
        user_id: u64,
        exclude_channel: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<CachedMessage>, CrosspostError> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, guild_id, channel_id, user_id, content, created_at
            FROM message_cache
            WHERE guild_id = ? AND user_id = ? AND channel_id != ? AND created_at > ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(exclude_channel as i64)
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| CachedMessage {
                message_id: row.get::<i64, _>("message_id") as u64,
                guild_id: row.get::<i64, _>("guild_id") as u64,
                channel_id: row.get::<i64, _>("channel_id") as u64,
                user_id: row.get::<i64, _>("user_id") as u64,
                content: row.get("content"),
                created_at: from_millis(row.get("created_at")),
            })
            .collect())
    }

    async fn remove(&self, message_id: u64) -> Result<(), CrosspostError> {
        sqlx::query("DELETE FROM message_cache WHERE message_id = ?")
            .bind(message_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn expire(&self, older_than: DateTime<Utc>) -> Result<u64, CrosspostError> {
        let result = sqlx::query("DELETE FROM message_cache WHERE created_at < ?")
            .bind(to_millis(older_than))
            .execute(&self.pool)
            .await
            .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
