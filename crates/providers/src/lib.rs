//! Outbound clients for Concierge.
//!
//! The completion client implements `concierge_core::Provider`; the search
//! client implements `concierge_core::SearchProvider`. [`build_from_config`]
//! wires both from an [`concierge_config::AppConfig`].

pub mod openai_compat;
pub mod router;
pub mod tavily;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{Providers, build_from_config, display_name};
pub use tavily::TavilyProvider;
