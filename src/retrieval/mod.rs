//! Hybrid retrieval and reranking
//!
//! Semantic search with a keyword fallback, then an optional cross-encoder
//! pass. Reranking never fails outward: any scoring problem hands back the
//! original ordering.

pub mod hybrid;
pub mod rerank;

pub use hybrid::HybridRetriever;
pub use rerank::{CrossEncoder, LexicalCrossEncoder, Reranker};
