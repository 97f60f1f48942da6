//! Knowledge-gap detection and the persistent gap log.

pub mod detector;
pub mod logger;
pub mod store;

pub use detector::{
    GapDetector, GapPriority, IngestionTrigger, PriorityBranch, SourceKind, MAX_IDENTIFIERS,
    MAX_SEARCH_TERMS,
};
pub use logger::GapLogger;
pub use store::{GapStats, GapStore, KBGapRecord, SqliteGapStore};
