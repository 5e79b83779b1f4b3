//! # Concierge Core
//!
//! Domain types, traits, and error definitions for the Concierge chat
//! pipeline. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Both external boundaries (the completion endpoint and the web-search
//! endpoint) are defined as traits here. Implementations live in
//! `concierge-providers`. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod search;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SearchError};
pub use knowledge::KnowledgeConfig;
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use search::{SearchDepth, SearchOptions, SearchProvider, SearchResponse, SearchResult};
