//! Error types for the Concierge domain.
//!
//! One enum per external boundary, folded into [`Error`] at the top.
//! Search failures never reach a caller as a request error: the pipeline
//! logs them and answers without augmentation.

use thiserror::Error;

/// The top-level error type for a chat request.
#[derive(Debug, Error)]
pub enum Error {
    // --- Boundaries ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Request rejection ---
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not configured")]
    NotConfigured(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures at the completion-provider boundary.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// The upstream HTTP status, when the provider answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// The search boundary is unavailable for this request.
///
/// Every variant is recoverable: callers proceed without search
/// augmentation instead of failing the request.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search provider not configured")]
    NotConfigured,

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Search API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("Search network error: {0}")]
    Network(String),

    #[error("Failed to parse search results: {0}")]
    Parse(String),
}
