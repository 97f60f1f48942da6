//! Append-oriented gap log with dedup over a sliding window.
//!
//! Logging a gap must never take the answer path down with it: `log`
//! swallows storage failures and hands back `None` instead of an error.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::gaps::store::{GapStats, GapStore, KBGapRecord};
use crate::knowledge::SearchFilter;
use crate::storage::now_ts;
use crate::types::Intent;

const SECONDS_PER_DAY: i64 = 86_400;

pub struct GapLogger {
    store: Arc<dyn GapStore>,
    window_days: i64,
}

impl GapLogger {
    pub fn new(store: Arc<dyn GapStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }

    /// Record a knowledge gap and return the record id.
    ///
    /// An unresolved record with the same query text inside the dedup
    /// window is reused: its frequency goes up and `last_asked_at` moves
    /// forward. On any storage failure this logs a warning and returns
    /// `None` so the caller can keep answering.
    pub async fn log(
        &self,
        query: &str,
        intent: &Intent,
        filter: &SearchFilter,
        user_id: &str,
    ) -> Option<String> {
        match self.log_inner(query, intent, filter).await {
            Ok(gap_id) => {
                debug!(gap_id = %gap_id, user_id = %user_id, "knowledge gap logged");
                Some(gap_id)
            }
            Err(e) => {
                warn!(error = %e, user_id = %user_id, "failed to log knowledge gap");
                None
            }
        }
    }

    async fn log_inner(&self, query: &str, intent: &Intent, filter: &SearchFilter) -> Result<String> {
        let now = now_ts();
        let window_start = now - self.window_days * SECONDS_PER_DAY;

        if let Some(existing) = self.store.find_unresolved(query, window_start).await? {
            self.store.touch(&existing.id, now).await?;
            return Ok(existing.id);
        }

        let vendor = filter
            .vendor
            .unwrap_or(intent.vendor)
            .tag()
            .to_string();
        let equipment = filter
            .equipment_type
            .unwrap_or(intent.equipment_type)
            .tag()
            .to_string();

        let record = KBGapRecord {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            intent_vendor: vendor,
            intent_equipment: equipment,
            intent_symptom: intent.symptom.clone(),
            frequency: 1,
            resolved: false,
            resolution_atom_ids: Vec::new(),
            triggered_at: now,
            last_asked_at: now,
            resolved_at: None,
        };
        self.store.insert(&record).await?;
        Ok(record.id)
    }

    /// Close out a gap once curated atoms exist for it.
    pub async fn mark_resolved(&self, gap_id: &str, atom_ids: &[String]) -> Result<()> {
        self.store.mark_resolved(gap_id, atom_ids, now_ts()).await
    }

    /// Most-asked gaps first; ties broken by recency.
    pub async fn top_gaps(
        &self,
        limit: usize,
        include_resolved: bool,
    ) -> Result<Vec<KBGapRecord>> {
        self.store.top_gaps(limit, include_resolved).await
    }

    pub async fn stats(&self) -> Result<GapStats> {
        self.store.stats().await
    }
}
