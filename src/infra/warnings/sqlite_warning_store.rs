// SQLite-backed warning store.
//
// Table:
// - warnings: one row per warning, manual or automated

use crate::core::warnings::{NewWarning, Warning, WarningError, WarningKind, WarningStore};
use crate::infra::database::{from_millis, to_millis};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteWarningStore {
    pool: Pool<Sqlite>,
}

impl SqliteWarningStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), WarningError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warnings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'manual',
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_warnings_guild_user
                ON warnings(guild_id, user_id, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| WarningError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn warning_from_row(row: &SqliteRow) -> Result<Warning, WarningError> {
    let kind: String = row.get("type");
    let kind = WarningKind::parse(&kind)
        .ok_or_else(|| WarningError::StorageError(format!("Unknown warning type: {kind}")))?;

    Ok(Warning {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        moderator_id: row.get::<i64, _>("moderator_id") as u64,
        reason: row.get("reason"),
        kind,
        created_at: from_millis(row.get("created_at")),
    })
}

#[async_trait]
impl WarningStore for SqliteWarningStore {
    async fn add(&self, warning: NewWarning) -> Result<Warning, WarningError> {
        let result = sqlx::query(
            r#"
            INSERT INTO warnings (guild_id, user_id, moderator_id, reason, type, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(warning.guild_id as i64)
        .bind(warning.user_id as i64)
        .bind(warning.moderator_id as i64)
        .bind(&warning.reason)
        .bind(warning.kind.as_str())
        .bind(to_millis(warning.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| WarningError::StorageError(e.to_string()))?;

        Ok(Warning {
            id: result.last_insert_rowid(),
            guild_id: warning.guild_id,
            user_id: warning.user_id,
            moderator_id: warning.moderator_id,
            reason: warning.reason,
            kind: warning.kind,
            created_at: warning.created_at,
        })
    }

    async fn list(&self, guild_id: u64, user_id: u64) -> Result<Vec<Warning>, WarningError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM warnings
            WHERE guild_id = ? AND user_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WarningError::StorageError(e.to_string()))?;

        rows.iter().map(warning_from_row).collect()
    }

    async fn count(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM warnings WHERE guild_id = ? AND user_id = ?")
                .bind(guild_id as i64)
                .bind(user_id as i64)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| WarningError::StorageError(e.to_string()))?;
        Ok(count as u64)
    }

    async fn delete_one(&self, warning_id: i64, guild_id: u64) -> Result<bool, WarningError> {
        let result = sqlx::query("DELETE FROM warnings WHERE id = ? AND guild_id = ?")
            .bind(warning_id)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| WarningError::StorageError(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_all(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError> {
        let result = sqlx::query("DELETE FROM warnings WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| WarningError::StorageError(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn list_guild(
        &self,
        guild_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Warning>, u64), WarningError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warnings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| WarningError::StorageError(e.to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM warnings
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
        .map_err(|e| WarningError::StorageError(e.to_string()))?;

        let warnings = rows
            .iter()
            .map(warning_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((warnings, total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(mins: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(mins)
    }

    fn new_warning(guild_id: u64, user_id: u64, reason: &str, mins: i64) -> NewWarning {
        NewWarning {
            guild_id,
            user_id,
            moderator_id: 3,
            reason: reason.to_string(),
            kind: WarningKind::Manual,
            created_at: at(mins),
        }
    }

    async fn store() -> SqliteWarningStore {
        let store = SqliteWarningStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let store = store().await;
        store.add(new_warning(1, 2, "later", 10)).await.unwrap();
        let mut auto = new_warning(1, 2, "earlier", 5);
        auto.kind = WarningKind::Crosspost;
        store.add(auto).await.unwrap();

        let list = store.list(1, 2).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].reason, "earlier");
        assert_eq!(list[0].kind, WarningKind::Crosspost);
        assert_eq!(list[0].created_at, at(5));
        assert_eq!(store.count(1, 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_one_scoped_to_guild() {
        let store = store().await;
        let warning = store.add(new_warning(1, 2, "x", 0)).await.unwrap();

        assert!(!store.delete_one(warning.id, 5).await.unwrap());
        assert!(store.delete_one(warning.id, 1).await.unwrap());
        assert!(!store.delete_one(warning.id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all_and_guild_listing() {
        let store = store().await;
        store.add(new_warning(1, 2, "a", 0)).await.unwrap();
        store.add(new_warning(1, 2, "b", 1)).await.unwrap();
        store.add(new_warning(1, 4, "c", 2)).await.unwrap();
        store.add(new_warning(9, 2, "other guild", 3)).await.unwrap();

        let (page, total) = store.list_guild(1, 25, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page[0].reason, "c");

        assert_eq!(store.clear_all(1, 2).await.unwrap(), 2);
        assert_eq!(store.count(1, 2).await.unwrap(), 0);
        assert_eq!(store.count(9, 2).await.unwrap(), 1);
    }
}
