// SQLite-backed guild settings.
//
// Table:
// - guild_settings: one JSON document per guild, created on first access

use crate::core::settings::{GuildSettings, SettingsError, SettingsStore, SETTINGS_VERSION};
use crate::infra::database::to_millis;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                version INTEGER NOT NULL,
                config TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load_or_create(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        let defaults = serde_json::to_string(&GuildSettings::default())
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO guild_settings (guild_id, version, config, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(guild_id as i64)
        .bind(SETTINGS_VERSION as i64)
        .bind(&defaults)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        let config: String =
            sqlx::query_scalar("SELECT config FROM guild_settings WHERE guild_id = ?")
                .bind(guild_id as i64)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        match serde_json::from_str::<GuildSettings>(&config) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(guild_id, "Corrupt guild settings, using defaults: {}", e);
                Ok(GuildSettings::default())
            }
        }
    }

    async fn save(&self, guild_id: u64, settings: &GuildSettings) -> Result<(), SettingsError> {
        let config = serde_json::to_string(settings)
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, version, config, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                version = excluded.version,
                config = excluded.config,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(guild_id as i64)
        .bind(settings.version as i64)
        .bind(&config)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        Ok(())
    }
}
