//! Reddit search provider over the public JSON API.
//!
//! Searches each subreddit in the scope in order, skipping subreddits that
//! fail, and only errors when every community is unreachable. Reddit wants
//! a descriptive user agent; the shared HTTP client carries it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{Result, RivetError};
use crate::research::forums::{ForumProvider, ForumResult, SearchScope, SourceType};

const REDDIT_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    title: String,
    author: String,
    subreddit: String,
    score: i64,
    url: String,
    permalink: String,
    #[serde(default)]
    selftext: String,
    num_comments: u64,
    #[serde(default)]
    over_18: bool,
}

#[derive(Debug, Clone)]
pub struct RedditProvider {
    client: Client,
    base_url: String,
}

impl RedditProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: REDDIT_BASE.to_string(),
        }
    }

    async fn search_subreddit(
        &self,
        subreddit: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ForumResult>> {
        let url = format!("{}/r/{}/search.json", self.base_url, subreddit);
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("sort", "relevance".to_string()),
            ("t", "all".to_string()),
            ("restrict_sr", "true".to_string()),
            ("raw_json", "1".to_string()),
        ];

        let response = self.client.get(&url).query(&params).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RivetError::RateLimited {
                provider: self.name().to_string(),
                retry_after_secs: None,
            });
        }
        if !response.status().is_success() {
            return Err(RivetError::ForumProvider {
                provider: self.name().to_string(),
                message: format!("r/{} returned status {}", subreddit, response.status()),
            });
        }

        let listing: ListingResponse = response.json().await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .filter(|post| !post.over_18)
            .map(to_forum_result)
            .collect())
    }
}

fn to_forum_result(post: RedditPost) -> ForumResult {
    ForumResult {
        source_type: SourceType::Reddit,
        url: format!("{}{}", REDDIT_BASE, post.permalink),
        title: post.title,
        content: post.selftext,
        score: post.score,
        metadata: json!({
            "subreddit": post.subreddit,
            "author": post.author,
            "num_comments": post.num_comments,
            "external_url": post.url,
        }),
    }
}

#[async_trait]
impl ForumProvider for RedditProvider {
    fn name(&self) -> &'static str {
        "reddit"
    }

    fn weight(&self) -> f32 {
        0.8
    }

    async fn search(
        &self,
        query: &str,
        scope: &SearchScope,
        limit: usize,
    ) -> Result<Vec<ForumResult>> {
        if scope.subreddits.is_empty() {
            return Err(RivetError::ForumProvider {
                provider: self.name().to_string(),
                message: "no subreddits configured".to_string(),
            });
        }

        let mut results = Vec::new();
        let mut last_error = None;

        for subreddit in &scope.subreddits {
            if results.len() >= limit {
                break;
            }
            match self.search_subreddit(subreddit, query, limit).await {
                Ok(posts) => {
                    debug!(subreddit = %subreddit, found = posts.len(), "subreddit searched");
                    results.extend(posts);
                }
                // Rate limiting applies to the whole host, not one community.
                Err(e @ RivetError::RateLimited { .. }) => return Err(e),
                Err(e) => {
                    warn!(subreddit = %subreddit, error = %e, "subreddit search failed");
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        results.truncate(limit);
        Ok(results)
    }
}
