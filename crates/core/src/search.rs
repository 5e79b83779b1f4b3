//! Search provider trait — the abstraction over the web-search endpoint.
//!
//! The pipeline only consumes the search boundary: it decides *whether* to
//! search, builds a query plus [`SearchOptions`], and hands them to a
//! [`SearchProvider`]. Any [`SearchError`] means "proceed without search".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Upper bound the search endpoint accepts for `max_results`.
pub const MAX_SEARCH_RESULTS: u8 = 10;

/// How thorough the search provider should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Number of results to request (never above [`MAX_SEARCH_RESULTS`])
    pub max_results: u8,

    /// Search depth
    pub depth: SearchDepth,

    /// Domains whose pages must not appear in the results
    #[serde(default)]
    pub exclude_domains: Vec<String>,

    /// Restrict results to these domains (empty = no restriction)
    #[serde(default)]
    pub include_domains: Vec<String>,

    /// Ask the provider for a synthesized direct answer
    #[serde(default = "default_include_answer")]
    pub include_answer: bool,
}

fn default_include_answer() -> bool {
    true
}

impl SearchOptions {
    /// Options with the given result count (clamped to the endpoint limit).
    pub fn new(max_results: u8, depth: SearchDepth) -> Self {
        Self {
            max_results: max_results.clamp(1, MAX_SEARCH_RESULTS),
            depth,
            exclude_domains: Vec::new(),
            include_domains: Vec::new(),
            include_answer: true,
        }
    }

    /// Add excluded domains, skipping duplicates.
    pub fn excluding<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for domain in domains {
            let domain = domain.into();
            if !self.exclude_domains.contains(&domain) {
                self.exclude_domains.push(domain);
            }
        }
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(5, SearchDepth::Basic)
    }
}

/// A single normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// A normalized search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query the provider actually ran
    pub query: String,

    /// Provider-synthesized direct answer, if requested and available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Hits in provider ranking order
    pub results: Vec<SearchResult>,

    /// Number of hits the provider returned
    pub result_count: usize,

    /// Provider-reported latency in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// The web-search boundary.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "tavily").
    fn name(&self) -> &str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Run a search. Implementations enforce their own timeout.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> std::result::Result<SearchResponse, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_results_is_clamped() {
        assert_eq!(SearchOptions::new(25, SearchDepth::Basic).max_results, 10);
        assert_eq!(SearchOptions::new(0, SearchDepth::Basic).max_results, 1);
    }

    #[test]
    fn excluding_skips_duplicates() {
        let opts = SearchOptions::default().excluding(["a.com", "b.com", "a.com"]);
        assert_eq!(opts.exclude_domains, vec!["a.com", "b.com"]);
    }

    #[test]
    fn depth_uses_wire_names() {
        assert_eq!(serde_json::to_string(&SearchDepth::Advanced).unwrap(), "\"advanced\"");
        let parsed: SearchDepth = serde_json::from_str("\"basic\"").unwrap();
        assert_eq!(parsed, SearchDepth::Basic);
    }
}
