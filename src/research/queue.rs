//! Ingestion queue: URLs waiting for the curation side to fetch and chunk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::Result;
use crate::research::forums::ForumResult;
use crate::storage::now_ts;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedSource {
    pub id: String,
    pub url: String,
    pub source_type: String,
    pub title: String,
    pub score: i64,
    pub status: String,
    pub queued_at: i64,
}

#[async_trait]
pub trait IngestionQueue: Send + Sync {
    /// Queue one discovered source; returns the queue row id.
    async fn enqueue(&self, source: &ForumResult) -> Result<String>;

    /// Oldest pending entries first.
    async fn pending(&self, limit: usize) -> Result<Vec<QueuedSource>>;

    async fn pending_count(&self) -> Result<i64>;
}

pub struct SqliteIngestionQueue {
    pool: SqlitePool,
}

impl SqliteIngestionQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestionQueue for SqliteIngestionQueue {
    async fn enqueue(&self, source: &ForumResult) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO ingestion_queue (id, url, source_type, title, score, status, queued_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&source.url)
        .bind(source.source_type.as_str())
        .bind(&source.title)
        .bind(source.score)
        .bind(STATUS_PENDING)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn pending(&self, limit: usize) -> Result<Vec<QueuedSource>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, source_type, title, score, status, queued_at
            FROM ingestion_queue
            WHERE status = ?
            ORDER BY queued_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(STATUS_PENDING)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QueuedSource {
                    id: row.try_get("id")?,
                    url: row.try_get("url")?,
                    source_type: row.try_get("source_type")?,
                    title: row.try_get("title")?,
                    score: row.try_get("score")?,
                    status: row.try_get("status")?,
                    queued_at: row.try_get("queued_at")?,
                })
            })
            .collect()
    }

    async fn pending_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM ingestion_queue WHERE status = ?")
            .bind(STATUS_PENDING)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
