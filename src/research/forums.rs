//! Community forum providers: the scraping seam of the research pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Which community a scraped result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    StackOverflow,
    Reddit,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::StackOverflow => "stackoverflow",
            SourceType::Reddit => "reddit",
        }
    }
}

/// One candidate source discovered by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumResult {
    pub source_type: SourceType,
    pub url: String,
    pub title: String,
    pub content: String,
    /// Community score (votes), used as the ranking tiebreaker.
    pub score: i64,
    pub metadata: serde_json::Value,
}

/// Hints narrowing where providers should look. Each provider reads the
/// fields it understands and ignores the rest.
#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    /// Subreddits to search, in order.
    pub subreddits: Vec<String>,
}

/// A searchable community source.
///
/// Implementations must surface rate limiting as
/// [`RivetError::RateLimited`](crate::errors::RivetError::RateLimited) so the
/// retry layer can back off instead of hammering the API.
#[async_trait]
pub trait ForumProvider: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Ranking weight. Results from heavier providers sort ahead of
    /// lighter ones regardless of community score.
    fn weight(&self) -> f32;

    async fn search(
        &self,
        query: &str,
        scope: &SearchScope,
        limit: usize,
    ) -> Result<Vec<ForumResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_serializes_as_flat_token() {
        assert_eq!(
            serde_json::to_value(SourceType::StackOverflow).unwrap(),
            "stackoverflow"
        );
        assert_eq!(serde_json::to_value(SourceType::Reddit).unwrap(), "reddit");
    }

    #[test]
    fn source_type_as_str_is_flat() {
        assert_eq!(SourceType::StackOverflow.as_str(), "stackoverflow");
        assert_eq!(SourceType::Reddit.as_str(), "reddit");
    }
}
