//! Shared SQLite storage: connection pool setup and schema migrations.
//!
//! One database file backs the gap log, source fingerprints, and the
//! ingestion queue. Callers open the pool once at startup and hand clones
//! to the stores that need it.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::Result;

/// Open (and create if missing) the SQLite database behind `config.db_path`.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.db_path.display()))
        .map_err(sqlx::Error::from)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    debug!(db_path = %config.db_path.display(), "sqlite pool opened");
    Ok(pool)
}

/// Create every table the engine persists to. Idempotent.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kb_gaps (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            intent_vendor TEXT NOT NULL,
            intent_equipment TEXT NOT NULL,
            intent_symptom TEXT NOT NULL DEFAULT '',
            frequency INTEGER NOT NULL DEFAULT 1,
            resolved INTEGER NOT NULL DEFAULT 0,
            resolution_atom_ids TEXT NOT NULL DEFAULT '[]',
            triggered_at INTEGER NOT NULL,
            last_asked_at INTEGER NOT NULL,
            resolved_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_kb_gaps_query ON kb_gaps(query, resolved, last_asked_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS source_fingerprints (
            url_hash TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            source_type TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingestion_queue (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            source_type TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            score INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            queued_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingestion_queue_status ON ingestion_queue(status, queued_at)",
    )
    .execute(pool)
    .await?;

    debug!("sqlite migrations applied");
    Ok(())
}

/// Current unix timestamp in seconds, as stored in every table.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = memory_pool().await;
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();

        sqlx::query("SELECT id FROM kb_gaps LIMIT 1")
            .fetch_optional(&pool)
            .await
            .unwrap();
        sqlx::query("SELECT url_hash FROM source_fingerprints LIMIT 1")
            .fetch_optional(&pool)
            .await
            .unwrap();
        sqlx::query("SELECT id FROM ingestion_queue LIMIT 1")
            .fetch_optional(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            db_path: dir.path().join("nested").join("rivet.db"),
        };
        let pool = connect(&config).await.unwrap();
        migrate(&pool).await.unwrap();
        assert!(config.db_path.exists());
        pool.close().await;
    }
}
