//! Intent extraction and answer-confidence collaborators
//!
//! Both are external model services in production, consumed behind traits
//! with fixed contracts. The keyword implementations here are deterministic
//! defaults so the engine runs without model infrastructure.

pub mod confidence;
pub mod extractor;

pub use confidence::{AnswerVerdict, ConfidenceScorer, HeuristicConfidenceScorer, VerdictAction};
pub use extractor::{IntentExtractor, KeywordIntentExtractor};
