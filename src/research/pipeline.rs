//! Research pipeline: query building, provider fan-out, dedup, and queueing.
//!
//! `run` is a hard error boundary. Whatever happens inside, the caller gets
//! a [`ResearchResult`]; a panic-free FAILED outcome is always preferable to
//! taking the answer path down.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ResearchConfig;
use crate::errors::{Result, RivetError};
use crate::research::fingerprint::FingerprintStore;
use crate::research::forums::{ForumProvider, ForumResult, SearchScope};
use crate::research::queue::IngestionQueue;
use crate::research::retry::RetryPolicy;
use crate::types::Intent;

/// Lifecycle of one research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    BuildingQuery,
    Scraping,
    Deduping,
    Queueing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    QueryBuilt,
    ScrapeComplete,
    DedupComplete,
    QueueComplete,
    Abort,
}

impl PipelineState {
    /// Advance along the fixed path. `Abort` is legal from any live state;
    /// everything else must follow the declared order.
    pub fn transition(self, event: PipelineEvent) -> Result<PipelineState> {
        let next = match (self, event) {
            (PipelineState::BuildingQuery, PipelineEvent::QueryBuilt) => PipelineState::Scraping,
            (PipelineState::Scraping, PipelineEvent::ScrapeComplete) => PipelineState::Deduping,
            (PipelineState::Deduping, PipelineEvent::DedupComplete) => PipelineState::Queueing,
            (PipelineState::Queueing, PipelineEvent::QueueComplete) => PipelineState::Done,
            (state, PipelineEvent::Abort) if !state.is_terminal() => PipelineState::Failed,
            (state, event) => {
                return Err(RivetError::InvalidTransition {
                    from: state.display_name().to_string(),
                    to: format!("{:?}", event),
                    reason: "event not legal in this state".to_string(),
                })
            }
        };
        Ok(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PipelineState::BuildingQuery => "building_query",
            PipelineState::Scraping => "scraping",
            PipelineState::Deduping => "deduping",
            PipelineState::Queueing => "queueing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    Done,
    Failed,
}

/// Outcome of one research run, reported to the asking user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub status: ResearchStatus,
    /// Raw results returned by providers, before dedup and capping.
    pub sources_found: usize,
    /// Newly claimed and queued URLs.
    pub sources_queued: usize,
    pub eta_minutes: u32,
    pub error: Option<String>,
}

pub struct ResearchPipeline {
    providers: Vec<Arc<dyn ForumProvider>>,
    fingerprints: Arc<dyn FingerprintStore>,
    queue: Arc<dyn IngestionQueue>,
    retry: RetryPolicy,
    config: ResearchConfig,
}

impl ResearchPipeline {
    pub fn new(
        providers: Vec<Arc<dyn ForumProvider>>,
        fingerprints: Arc<dyn FingerprintStore>,
        queue: Arc<dyn IngestionQueue>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            providers,
            fingerprints,
            queue,
            retry: RetryPolicy::new(),
            config,
        }
    }

    /// Run research for an uncovered question. Never returns `Err`; every
    /// failure mode collapses into a FAILED result.
    pub async fn run(&self, intent: &Intent, raw_question: &str) -> ResearchResult {
        let budget = Duration::from_secs(self.config.run_budget_secs);
        match tokio::time::timeout(budget, self.run_inner(intent, raw_question)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "research run failed");
                self.failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    budget_secs = self.config.run_budget_secs,
                    "research run exceeded budget"
                );
                self.failed(format!(
                    "run exceeded {}s budget",
                    self.config.run_budget_secs
                ))
            }
        }
    }

    fn failed(&self, message: String) -> ResearchResult {
        ResearchResult {
            status: ResearchStatus::Failed,
            sources_found: 0,
            sources_queued: 0,
            eta_minutes: self.config.eta_minutes,
            error: Some(message),
        }
    }

    async fn run_inner(&self, intent: &Intent, raw_question: &str) -> Result<ResearchResult> {
        let mut state = PipelineState::BuildingQuery;

        let query = build_query(intent, raw_question);
        debug!(query = %query, "research query built");
        state = state.transition(PipelineEvent::QueryBuilt)?;

        let scope = SearchScope {
            subreddits: self.config.subreddits.clone(),
        };
        let limit = self.config.max_sources;
        let per_call = Duration::from_secs(self.config.provider_timeout_secs);

        let searches = self.providers.iter().map(|provider| {
            let query = query.clone();
            let scope = scope.clone();
            async move {
                let name = provider.name();
                let attempt = self
                    .retry
                    .execute(name, || provider.search(&query, &scope, limit));
                match tokio::time::timeout(per_call, attempt).await {
                    Ok(Ok(results)) => (provider.weight(), results),
                    Ok(Err(e)) => {
                        warn!(provider = name, error = %e, "provider search failed");
                        (provider.weight(), Vec::new())
                    }
                    Err(_) => {
                        warn!(
                            provider = name,
                            timeout_secs = self.config.provider_timeout_secs,
                            "provider search timed out"
                        );
                        (provider.weight(), Vec::new())
                    }
                }
            }
        });
        let batches: Vec<(f32, Vec<ForumResult>)> = futures_util::future::join_all(searches).await;

        let sources_found: usize = batches.iter().map(|(_, results)| results.len()).sum();
        state = state.transition(PipelineEvent::ScrapeComplete)?;

        if sources_found == 0 {
            state = state.transition(PipelineEvent::Abort)?;
            debug!(state = state.display_name(), "no provider returned results");
            return Ok(ResearchResult {
                status: ResearchStatus::Failed,
                sources_found: 0,
                sources_queued: 0,
                eta_minutes: self.config.eta_minutes,
                error: Some("no sources found by any provider".to_string()),
            });
        }

        // Rank: provider weight first, community score second, then cap.
        let mut ranked: Vec<(f32, ForumResult)> = batches
            .into_iter()
            .flat_map(|(weight, results)| {
                results.into_iter().map(move |result| (weight, result))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.score.cmp(&a.1.score))
        });

        let mut seen_urls = std::collections::HashSet::new();
        ranked.retain(|(_, result)| seen_urls.insert(result.url.clone()));
        ranked.truncate(limit);
        state = state.transition(PipelineEvent::DedupComplete)?;

        let mut sources_queued = 0;
        for (_, result) in &ranked {
            match self
                .fingerprints
                .try_claim(&result.url, result.source_type.as_str())
                .await
            {
                Ok(true) => match self.queue.enqueue(result).await {
                    Ok(_) => sources_queued += 1,
                    Err(e) => warn!(url = %result.url, error = %e, "enqueue failed"),
                },
                Ok(false) => {
                    debug!(url = %result.url, "already fingerprinted, skipping");
                }
                Err(e) => {
                    warn!(url = %result.url, error = %e, "fingerprint claim failed");
                }
            }
        }
        state = state.transition(PipelineEvent::QueueComplete)?;

        info!(
            state = state.display_name(),
            sources_found, sources_queued, "research run complete"
        );
        Ok(ResearchResult {
            status: ResearchStatus::Done,
            sources_found,
            sources_queued,
            eta_minutes: self.config.eta_minutes,
            error: None,
        })
    }
}

/// Community search query: vendor, equipment, and symptom when present,
/// falling back to the raw question for sparse intents.
fn build_query(intent: &Intent, raw_question: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !intent.vendor.is_generic() {
        parts.push(intent.vendor.display_name().to_string());
    }
    if intent.equipment_type.is_known() {
        parts.push(intent.equipment_type.display_name().to_string());
    }
    if !intent.symptom.trim().is_empty() {
        parts.push(intent.symptom.trim().to_string());
    }
    if let Some(code) = intent.fault_codes.first() {
        parts.push(code.clone());
    }

    if parts.is_empty() {
        raw_question.trim().to_string()
    } else {
        parts.join(" ")
    }
}
