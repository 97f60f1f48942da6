//! Coverage evaluation
//!
//! Classifies how well the knowledge store can answer a query by probing
//! the retriever and counting hits against two configured thresholds. The
//! classifier itself is a pure function of the count; the evaluator owns
//! the one retrieval call and absorbs its failures.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::config::CoverageConfig;
use crate::knowledge::{RetrievedDoc, SearchFilter};
use crate::retrieval::HybridRetriever;

/// Coarse estimate of knowledge-store depth for a query.
///
/// Ordered so that more coverage compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    None,
    Thin,
    Strong,
}

impl CoverageLevel {
    /// True when this coverage should trigger gap detection
    pub fn is_gap(&self) -> bool {
        matches!(self, CoverageLevel::None | CoverageLevel::Thin)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CoverageLevel::None => "none",
            CoverageLevel::Thin => "thin",
            CoverageLevel::Strong => "strong",
        }
    }
}

/// Pure threshold rule: `thin_min <= count < strong_min` is THIN,
/// `count >= strong_min` is STRONG, anything below is NONE.
pub fn classify(doc_count: usize, thin_min: usize, strong_min: usize) -> CoverageLevel {
    if doc_count >= strong_min {
        CoverageLevel::Strong
    } else if doc_count >= thin_min {
        CoverageLevel::Thin
    } else {
        CoverageLevel::None
    }
}

/// Result of one coverage probe: the level plus the probe documents, which
/// the answer path reuses instead of searching again
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub level: CoverageLevel,
    pub docs: Vec<RetrievedDoc>,
}

/// Probes the retriever at a generous top-k and classifies result density
pub struct CoverageEvaluator {
    retriever: Arc<HybridRetriever>,
    config: CoverageConfig,
}

impl CoverageEvaluator {
    pub fn new(retriever: Arc<HybridRetriever>, config: CoverageConfig) -> Self {
        Self { retriever, config }
    }

    /// One retrieval call, classified. Retrieval failure degrades to a NONE
    /// report with no documents; the route decision proceeds on that.
    pub async fn evaluate(&self, query: &str, filter: &SearchFilter) -> CoverageReport {
        let docs = match self
            .retriever
            .retrieve(query, filter, self.config.probe_top_k)
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "coverage probe failed, classifying as no coverage");
                Vec::new()
            }
        };

        let level = classify(docs.len(), self.config.thin_min, self.config.strong_min);
        CoverageReport { level, docs }
    }
}
