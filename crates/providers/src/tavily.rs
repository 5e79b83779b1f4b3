//! Tavily web-search client.
//!
//! Posts a query to `/search`, enforces a hard timeout, and normalizes the
//! payload into a [`SearchResponse`], filling neutral defaults for fields the
//! provider leaves out. Every failure is a [`SearchError`]; callers treat
//! those as "no augmentation", never as a failed request.

use async_trait::async_trait;
use concierge_core::error::SearchError;
use concierge_core::search::{
    MAX_SEARCH_RESULTS, SearchOptions, SearchProvider, SearchResponse, SearchResult,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Title used when a hit comes back without one.
pub const MISSING_TITLE: &str = "Titolo non disponibile";

pub struct TavilyProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl TavilyProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, api_key: &str, body: &ApiRequest<'_>) -> Result<RawResponse, SearchError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json::<RawResponse>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::NotConfigured);
        };

        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query must be a non-empty string".into(),
            ));
        }

        let body = ApiRequest {
            query,
            search_depth: options.depth.as_str(),
            include_answer: options.include_answer,
            max_results: options.max_results.min(MAX_SEARCH_RESULTS),
            include_domains: &options.include_domains,
            exclude_domains: &options.exclude_domains,
            include_raw_content: false,
            include_images: false,
        };

        info!(query, depth = %options.depth, max_results = body.max_results, "Running web search");

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let raw = match tokio::time::timeout(self.timeout, self.send(api_key, &body)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms, "Search request timed out");
                return Err(SearchError::Timeout { timeout_ms });
            }
        };

        let response = format_results(raw, query);
        debug!(
            results = response.result_count,
            has_answer = response.answer.is_some(),
            "Search completed"
        );
        Ok(response)
    }
}

/// Normalize a raw provider payload.
///
/// `fallback_query` is used when the payload does not echo the query back.
pub fn format_results(raw: RawResponse, fallback_query: &str) -> SearchResponse {
    let results: Vec<SearchResult> = raw
        .results
        .into_iter()
        .map(|hit| SearchResult {
            title: hit
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| MISSING_TITLE.to_string()),
            url: hit.url.unwrap_or_default(),
            content: hit.content.unwrap_or_default(),
            score: hit.score.unwrap_or(0.0),
            favicon: hit.favicon,
        })
        .collect();

    SearchResponse {
        query: raw
            .query
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| fallback_query.to_string()),
        answer: raw.answer.filter(|a| !a.trim().is_empty()),
        result_count: results.len(),
        results,
        response_time: raw.response_time,
    }
}

// --- Tavily API types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    include_answer: bool,
    max_results: u8,
    include_domains: &'a [String],
    exclude_domains: &'a [String],
    include_raw_content: bool,
    include_images: bool,
}

/// The provider payload as received; every field may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<RawResult>,
    #[serde(default)]
    pub response_time: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub favicon: Option<String>,
}
