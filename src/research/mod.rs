//! Autonomous research: forum scraping, dedup, and ingestion queueing.

pub mod fingerprint;
pub mod forums;
pub mod pipeline;
pub mod queue;
pub mod reddit;
pub mod retry;
pub mod stackexchange;

pub use fingerprint::{url_hash, FingerprintStore, SourceFingerprint, SqliteFingerprintStore};
pub use forums::{ForumProvider, ForumResult, SearchScope, SourceType};
pub use pipeline::{
    PipelineEvent, PipelineState, ResearchPipeline, ResearchResult, ResearchStatus,
};
pub use queue::{IngestionQueue, QueuedSource, SqliteIngestionQueue};
pub use reddit::RedditProvider;
pub use retry::RetryPolicy;
pub use stackexchange::StackExchangeProvider;
