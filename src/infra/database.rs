// Shared SQLite connection pool.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Open (creating if needed) the bot's database file.
pub async fn open_pool(database_path: &str) -> anyhow::Result<Pool<Sqlite>> {
    let path_str = database_path.trim_start_matches("sqlite://");
    if !database_path.contains(":memory:") && !Path::new(path_str).exists() {
        if let Some(parent) = Path::new(path_str).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::File::create(path_str)?;
    }

    let conn_str = if database_path.starts_with("sqlite:") {
        database_path.to_string()
    } else {
        format!("sqlite://{}", database_path)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await?;
    Ok(pool)
}

/// Timestamps are stored as integer Unix milliseconds.
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Single-connection in-memory pool; every connection to `:memory:` is a
/// separate database, so more than one would lose the schema.
#[cfg(test)]
pub async fn memory_pool() -> Pool<Sqlite> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}
