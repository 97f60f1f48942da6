//! Cross-encoder reranking with graceful degradation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::errors::Result;
use crate::knowledge::RetrievedDoc;

/// Scores one query/document pair. Model-backed implementations are
/// external collaborators; the lexical scorer below is the in-crate default.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score(&self, query: &str, document: &str) -> Result<f32>;
}

/// Word-overlap scorer: fraction of query words found in the document
pub struct LexicalCrossEncoder;

#[async_trait]
impl CrossEncoder for LexicalCrossEncoder {
    async fn score(&self, query: &str, document: &str) -> Result<f32> {
        let doc_lower = document.to_lowercase();
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .collect();

        if words.is_empty() {
            return Ok(0.0);
        }

        let matches = words.iter().filter(|w| doc_lower.contains(*w)).count();
        Ok(matches as f32 / words.len() as f32)
    }
}

/// Secondary ranking stage over retrieved candidates.
///
/// Takes up to `2 * top_k` candidates and returns the best `top_k` by
/// cross-encoder score. Any scoring failure returns the original order
/// truncated to `top_k`; the failure is logged, never propagated.
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self {
        Self { encoder }
    }

    pub async fn rerank(
        &self,
        query: &str,
        docs: Vec<RetrievedDoc>,
        top_k: usize,
    ) -> Vec<RetrievedDoc> {
        let mut candidates = docs;
        candidates.truncate(top_k * 2);

        let mut scored: Vec<(f32, RetrievedDoc)> = Vec::with_capacity(candidates.len());
        for doc in &candidates {
            let text = format!("{} {}", doc.title, doc.content);
            match self.encoder.score(query, &text).await {
                Ok(score) => scored.push((score, doc.clone())),
                Err(e) => {
                    warn!(error = %e, atom_id = %doc.atom_id, "cross-encoder failed, keeping original order");
                    candidates.truncate(top_k);
                    return candidates;
                }
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored.into_iter().map(|(_, doc)| doc).collect()
    }
}
