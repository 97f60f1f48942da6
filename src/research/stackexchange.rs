//! Stack Exchange search provider.
//!
//! Uses the public 2.3 API. Quota exhaustion and HTTP 429 both surface as
//! [`RivetError::RateLimited`] so the retry layer backs off.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{Result, RivetError};
use crate::research::forums::{ForumProvider, ForumResult, SearchScope, SourceType};

const API_BASE: &str = "https://api.stackexchange.com/2.3";

/// `withbody` so question bodies come back in search results.
const SEARCH_FILTER: &str = "withbody";

#[derive(Debug, Deserialize)]
struct SearchQuestion {
    question_id: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    link: String,
    score: i32,
    view_count: u64,
    answer_count: u64,
    is_answered: bool,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    items: Vec<T>,
    #[serde(default)]
    quota_remaining: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StackExchangeProvider {
    client: Client,
    site: String,
}

impl StackExchangeProvider {
    pub fn new(client: Client, site: impl Into<String>) -> Self {
        Self {
            client,
            site: site.into(),
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/search/advanced?order=desc&sort=relevance&q={}&site={}&pagesize={}&filter={}",
            API_BASE,
            urlencoding::encode(query),
            urlencoding::encode(&self.site),
            limit,
            SEARCH_FILTER
        )
    }
}

fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Drop HTML tags from question bodies, keeping the text between them.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_forum_result(question: SearchQuestion) -> ForumResult {
    let content = question
        .body
        .as_deref()
        .map(strip_tags)
        .unwrap_or_default();
    ForumResult {
        source_type: SourceType::StackOverflow,
        url: question.link,
        title: question.title,
        content,
        score: i64::from(question.score),
        metadata: json!({
            "question_id": question.question_id,
            "answer_count": question.answer_count,
            "is_answered": question.is_answered,
            "view_count": question.view_count,
            "tags": question.tags,
        }),
    }
}

#[async_trait]
impl ForumProvider for StackExchangeProvider {
    fn name(&self) -> &'static str {
        "stackexchange"
    }

    fn weight(&self) -> f32 {
        1.0
    }

    async fn search(
        &self,
        query: &str,
        _scope: &SearchScope,
        limit: usize,
    ) -> Result<Vec<ForumResult>> {
        let url = self.search_url(query, limit);
        debug!(site = %self.site, query = %query, "searching stack exchange");

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RivetError::RateLimited {
                provider: self.name().to_string(),
                retry_after_secs: retry_after_secs(&response),
            });
        }
        if !response.status().is_success() {
            return Err(RivetError::ForumProvider {
                provider: self.name().to_string(),
                message: format!("unexpected status {}", response.status()),
            });
        }

        let body: ApiResponse<SearchQuestion> = response.json().await?;

        if body.items.is_empty() && body.quota_remaining == Some(0) {
            return Err(RivetError::RateLimited {
                provider: self.name().to_string(),
                retry_after_secs: None,
            });
        }
        if let Some(quota) = body.quota_remaining {
            if quota < 50 {
                warn!(quota, "stack exchange quota running low");
            }
        }

        Ok(body.items.into_iter().map(to_forum_result).collect())
    }
}
