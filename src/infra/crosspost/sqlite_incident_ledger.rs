// SQLite-backed crosspost incident history.
//
// Table:
// - crosspost_incidents: append-only, one row per detected crosspost

use crate::core::crosspost::{CrosspostError, CrosspostIncident, IncidentAction, IncidentLedger, NewIncident};
use crate::infra::database::{from_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteIncidentLedger {
    pool: Pool<Sqlite>,
}

impl SqliteIncidentLedger {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), CrosspostError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crosspost_incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                original_message_id INTEGER NOT NULL,
                duplicate_message_id INTEGER NOT NULL,
                original_channel_id INTEGER NOT NULL,
                duplicate_channel_id INTEGER NOT NULL,
                original_content TEXT NOT NULL,
                duplicate_content TEXT NOT NULL,
                similarity REAL NOT NULL,
                action TEXT NOT NULL CHECK (action IN ('deleted', 'warned')),
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_crosspost_incidents_guild_user
                ON crosspost_incidents(guild_id, user_id, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn incident_from_row(row: &SqliteRow) -> Result<CrosspostIncident, CrosspostError> {
    let action: String = row.get("action");
    let action = IncidentAction::parse(&action)
        .ok_or_else(|| CrosspostError::StorageError(format!("Unknown incident action: {action}")))?;

    Ok(CrosspostIncident {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        original_message_id: row.get::<i64, _>("original_message_id") as u64,
        duplicate_message_id: row.get::<i64, _>("duplicate_message_id") as u64,
        original_channel_id: row.get::<i64, _>("original_channel_id") as u64,
        duplicate_channel_id: row.get::<i64, _>("duplicate_channel_id") as u64,
        original_content: row.get("original_content"),
        duplicate_content: row.get("duplicate_content"),
        similarity: row.get("similarity"),
        action,
        created_at: from_millis(row.get("created_at")),
    })
}

#[async_trait]
impl IncidentLedger for SqliteIncidentLedger {
    async fn record(&self, incident: NewIncident) -> Result<CrosspostIncident, CrosspostError> {
        let result = sqlx::query(
            r#"
            INSERT INTO crosspost_incidents (
                guild_id, user_id, original_message_id, duplicate_message_id,
                original_channel_id, duplicate_channel_id, original_content,
                duplicate_content, similarity, action, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(incident.guild_id as i64)
        .bind(incident.user_id as i64)
        .bind(incident.original_message_id as i64)
        .bind(incident.duplicate_message_id as i64)
        .bind(incident.original_channel_id as i64)
        .bind(incident.duplicate_channel_id as i64)
        .bind(&incident.original_content)
        .bind(&incident.duplicate_content)
        .bind(incident.similarity)
        .bind(incident.action.as_str())
        .bind(to_millis(incident.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;

        Ok(CrosspostIncident {
            id: result.last_insert_rowid(),
            guild_id: incident.guild_id,
            user_id: incident.user_id,
            original_message_id: incident.original_message_id,
            duplicate_message_id: incident.duplicate_message_id,
            original_channel_id: incident.original_channel_id,
            duplicate_channel_id: incident.duplicate_channel_id,
            original_content: incident.original_content,
            duplicate_content: incident.duplicate_content,
            similarity: incident.similarity,
            action: incident.action,
            created_at: incident.created_at,
        })
    }

    async fn count_since(
        &self,
        guild_id: u64,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u64, CrosspostError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM crosspost_incidents
            WHERE guild_id = ? AND user_id = ? AND created_at > ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(to_millis(since))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;
        Ok(count as u64)
    }

    async fn list_guild(
        &self,
        guild_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<CrosspostIncident>, u64), CrosspostError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM crosspost_incidents WHERE guild_id = ?")
                .bind(guild_id as i64)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| CrosspostError::StorageError(e.to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM crosspost_incidents
            WHERE guild_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrosspostError::StorageError(e.to_string()))?;

        let incidents = rows
            .iter()
            .map(incident_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((incidents, total as u64))
    }
}
