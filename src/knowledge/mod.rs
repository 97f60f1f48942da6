//! Knowledge store access
//!
//! The searchable atom store is an external collaborator reached through
//! the `KnowledgeStore` trait. The Qdrant implementation here is the
//! production path; tests substitute mocks.

pub mod embed;
pub mod qdrant;
pub mod store;

pub use embed::{EmbeddingProvider, HashingEmbedder};
pub use qdrant::QdrantKnowledgeStore;
pub use store::{KnowledgeStore, RetrievedDoc, SearchFilter};
