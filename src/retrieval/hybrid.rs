//! Hybrid search over the knowledge store

use std::sync::Arc;
use tracing::warn;

use crate::errors::Result;
use crate::knowledge::{KnowledgeStore, RetrievedDoc, SearchFilter};

/// Two-stage retriever: semantic search first, lexical fallback second.
///
/// Only when both paths fail does an error reach the caller; the coverage
/// evaluator absorbs that as zero documents.
pub struct HybridRetriever {
    store: Arc<dyn KnowledgeStore>,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        match self.store.semantic_search(query, filter, top_k).await {
            Ok(docs) => Ok(docs),
            Err(e) => {
                warn!(error = %e, "semantic search failed, falling back to keyword search");
                self.store.keyword_search(query, filter, top_k).await
            }
        }
    }
}
