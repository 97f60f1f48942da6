//! Answer-quality assessment seam and heuristic default

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::knowledge::RetrievedDoc;

/// What the scorer recommends doing with the drafted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictAction {
    Answer,
    AnswerWithCaution,
    Escalate,
}

/// Answer-quality verdict over retrieved documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerVerdict {
    /// Quality estimate in [0, 1]
    pub confidence: f32,
    pub action: VerdictAction,
}

/// Judges how well the retrieved documents support an answer
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn assess(&self, query: &str, docs: &[RetrievedDoc]) -> Result<AnswerVerdict>;
}

/// Three-factor weighted scorer: document count, best similarity, and mean
/// similarity. Output bounded to [0, 1].
pub struct HeuristicConfidenceScorer {
    weight_count: f32,
    weight_top: f32,
    weight_mean: f32,
}

impl HeuristicConfidenceScorer {
    pub fn new() -> Self {
        Self {
            weight_count: 0.3,
            weight_top: 0.4,
            weight_mean: 0.3,
        }
    }
}

impl Default for HeuristicConfidenceScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfidenceScorer for HeuristicConfidenceScorer {
    async fn assess(&self, _query: &str, docs: &[RetrievedDoc]) -> Result<AnswerVerdict> {
        if docs.is_empty() {
            return Ok(AnswerVerdict {
                confidence: 0.0,
                action: VerdictAction::Escalate,
            });
        }

        let count_factor = (docs.len() as f32 / 5.0).min(1.0);
        let top_factor = docs
            .iter()
            .map(|d| d.similarity)
            .fold(0.0f32, f32::max)
            .clamp(0.0, 1.0);
        let mean_factor = (docs.iter().map(|d| d.similarity).sum::<f32>() / docs.len() as f32)
            .clamp(0.0, 1.0);

        let confidence = (self.weight_count * count_factor
            + self.weight_top * top_factor
            + self.weight_mean * mean_factor)
            .clamp(0.0, 1.0);

        let action = if confidence >= 0.7 {
            VerdictAction::Answer
        } else if confidence >= 0.4 {
            VerdictAction::AnswerWithCaution
        } else {
            VerdictAction::Escalate
        };

        Ok(AnswerVerdict { confidence, action })
    }
}
