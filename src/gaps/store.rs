//! Persistence for knowledge-base gap records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::errors::Result;

/// One logged knowledge gap: a question the knowledge base could not cover.
///
/// Repeat questions inside the dedup window land on the same record and
/// bump `frequency` instead of creating a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KBGapRecord {
    pub id: String,
    pub query: String,
    pub intent_vendor: String,
    pub intent_equipment: String,
    pub intent_symptom: String,
    pub frequency: i64,
    pub resolved: bool,
    pub resolution_atom_ids: Vec<String>,
    pub triggered_at: i64,
    pub last_asked_at: i64,
    pub resolved_at: Option<i64>,
}

/// Aggregate counters over the gap log, for the `gaps stats` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapStats {
    pub total: i64,
    pub resolved: i64,
    pub unresolved: i64,
    pub resolution_rate: f64,
    pub avg_frequency: f64,
    /// Mean hours between first trigger and resolution, over resolved gaps.
    pub avg_resolution_hours: Option<f64>,
}

#[async_trait]
pub trait GapStore: Send + Sync {
    /// Find an unresolved record with this exact query text whose
    /// `last_asked_at` falls on or after `window_start_ts`.
    async fn find_unresolved(&self, query: &str, window_start_ts: i64)
        -> Result<Option<KBGapRecord>>;

    async fn insert(&self, record: &KBGapRecord) -> Result<()>;

    /// Register a repeat ask: bump frequency and refresh `last_asked_at`.
    async fn touch(&self, id: &str, asked_at: i64) -> Result<()>;

    async fn mark_resolved(&self, id: &str, atom_ids: &[String], resolved_at: i64) -> Result<()>;

    /// Gaps ordered by frequency (desc), then recency (desc).
    async fn top_gaps(&self, limit: usize, include_resolved: bool) -> Result<Vec<KBGapRecord>>;

    async fn stats(&self) -> Result<GapStats>;
}

/// SQLite-backed gap store over the shared `kb_gaps` table.
pub struct SqliteGapStore {
    pool: SqlitePool,
}

impl SqliteGapStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<KBGapRecord> {
        let atom_ids_json: String = row.try_get("resolution_atom_ids")?;
        let resolution_atom_ids: Vec<String> =
            serde_json::from_str(&atom_ids_json).unwrap_or_default();
        let resolved: i64 = row.try_get("resolved")?;

        Ok(KBGapRecord {
            id: row.try_get("id")?,
            query: row.try_get("query")?,
            intent_vendor: row.try_get("intent_vendor")?,
            intent_equipment: row.try_get("intent_equipment")?,
            intent_symptom: row.try_get("intent_symptom")?,
            frequency: row.try_get("frequency")?,
            resolved: resolved != 0,
            resolution_atom_ids,
            triggered_at: row.try_get("triggered_at")?,
            last_asked_at: row.try_get("last_asked_at")?,
            resolved_at: row.try_get("resolved_at")?,
        })
    }
}

#[async_trait]
impl GapStore for SqliteGapStore {
    async fn find_unresolved(
        &self,
        query: &str,
        window_start_ts: i64,
    ) -> Result<Option<KBGapRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, query, intent_vendor, intent_equipment, intent_symptom,
                   frequency, resolved, resolution_atom_ids,
                   triggered_at, last_asked_at, resolved_at
            FROM kb_gaps
            WHERE query = ? AND resolved = 0 AND last_asked_at >= ?
            ORDER BY last_asked_at DESC
            LIMIT 1
            "#,
        )
        .bind(query)
        .bind(window_start_ts)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: &KBGapRecord) -> Result<()> {
        let atom_ids_json = serde_json::to_string(&record.resolution_atom_ids)?;
        sqlx::query(
            r#"
            INSERT INTO kb_gaps (
                id, query, intent_vendor, intent_equipment, intent_symptom,
                frequency, resolved, resolution_atom_ids,
                triggered_at, last_asked_at, resolved_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.query)
        .bind(&record.intent_vendor)
        .bind(&record.intent_equipment)
        .bind(&record.intent_symptom)
        .bind(record.frequency)
        .bind(record.resolved as i64)
        .bind(atom_ids_json)
        .bind(record.triggered_at)
        .bind(record.last_asked_at)
        .bind(record.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch(&self, id: &str, asked_at: i64) -> Result<()> {
        sqlx::query(
            "UPDATE kb_gaps SET frequency = frequency + 1, last_asked_at = ? WHERE id = ?",
        )
        .bind(asked_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_resolved(&self, id: &str, atom_ids: &[String], resolved_at: i64) -> Result<()> {
        let atom_ids_json = serde_json::to_string(atom_ids)?;
        let result = sqlx::query(
            "UPDATE kb_gaps SET resolved = 1, resolution_atom_ids = ?, resolved_at = ? WHERE id = ?",
        )
        .bind(atom_ids_json)
        .bind(resolved_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::errors::RivetError::InvalidRequest(format!(
                "no gap record with id {}",
                id
            )));
        }
        Ok(())
    }

    async fn top_gaps(&self, limit: usize, include_resolved: bool) -> Result<Vec<KBGapRecord>> {
        let sql = if include_resolved {
            r#"
            SELECT id, query, intent_vendor, intent_equipment, intent_symptom,
                   frequency, resolved, resolution_atom_ids,
                   triggered_at, last_asked_at, resolved_at
            FROM kb_gaps
            ORDER BY frequency DESC, last_asked_at DESC
            LIMIT ?
            "#
        } else {
            r#"
            SELECT id, query, intent_vendor, intent_equipment, intent_symptom,
                   frequency, resolved, resolution_atom_ids,
                   triggered_at, last_asked_at, resolved_at
            FROM kb_gaps
            WHERE resolved = 0
            ORDER BY frequency DESC, last_asked_at DESC
            LIMIT ?
            "#
        };

        let rows = sqlx::query(sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn stats(&self) -> Result<GapStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(resolved), 0) AS resolved,
                COALESCE(AVG(frequency), 0.0) AS avg_frequency
            FROM kb_gaps
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total")?;
        let resolved: i64 = row.try_get("resolved")?;
        let avg_frequency: f64 = row.try_get("avg_frequency")?;

        let latency_row = sqlx::query(
            r#"
            SELECT AVG(CAST(resolved_at - triggered_at AS REAL) / 3600.0) AS avg_hours
            FROM kb_gaps
            WHERE resolved = 1 AND resolved_at IS NOT NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let avg_resolution_hours: Option<f64> = latency_row.try_get("avg_hours")?;

        let resolution_rate = if total > 0 {
            resolved as f64 / total as f64
        } else {
            0.0
        };

        Ok(GapStats {
            total,
            resolved,
            unresolved: total - resolved,
            resolution_rate,
            avg_frequency,
            avg_resolution_hours,
        })
    }
}
