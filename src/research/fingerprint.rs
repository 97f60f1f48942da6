//! URL fingerprints guarding the ingestion queue against duplicates.
//!
//! The primary-key insert is the authority on uniqueness. Concurrent runs
//! racing on the same URL both call `try_claim`; exactly one sees `true`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::errors::Result;
use crate::storage::now_ts;

/// Hex SHA-256 of the source URL.
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub url_hash: String,
    pub url: String,
    pub source_type: String,
    pub created_at: i64,
}

#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Claim a URL for ingestion. Returns `true` when this call inserted
    /// the fingerprint, `false` when the URL was already claimed. A
    /// duplicate is not an error.
    async fn try_claim(&self, url: &str, source_type: &str) -> Result<bool>;

    async fn contains(&self, url: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqliteFingerprintStore {
    pool: SqlitePool,
}

impl SqliteFingerprintStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FingerprintStore for SqliteFingerprintStore {
    async fn try_claim(&self, url: &str, source_type: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO source_fingerprints (url_hash, url, source_type, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(url_hash(url))
        .bind(url)
        .bind(source_type)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn contains(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM source_fingerprints WHERE url_hash = ?")
            .bind(url_hash(url))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM source_fingerprints")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
