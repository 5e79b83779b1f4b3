//! Provider wiring — builds the completion and search clients from config.

use std::sync::Arc;
use std::time::Duration;

use concierge_config::AppConfig;
use concierge_core::provider::Provider;
use concierge_core::search::SearchProvider;

use crate::openai_compat::OpenAiCompatProvider;
use crate::tavily::TavilyProvider;

/// The two outbound boundaries a pipeline talks to.
#[derive(Clone)]
pub struct Providers {
    pub completion: Arc<dyn Provider>,
    /// Absent when no search credential is configured.
    pub search: Option<Arc<dyn SearchProvider>>,
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> Providers {
    let completion = OpenAiCompatProvider::new(
        &config.provider.name,
        &config.provider.base_url,
        config.api_key.clone().unwrap_or_default(),
    )
    .with_timeout(Duration::from_secs(config.provider.timeout_secs.max(1)));

    let search = TavilyProvider::new(config.search_api_key.clone())
        .with_base_url(&config.search.base_url)
        .with_timeout(Duration::from_millis(config.search.timeout_ms));

    let search: Option<Arc<dyn SearchProvider>> = if search.is_configured() {
        Some(Arc::new(search))
    } else {
        tracing::info!("No search API key configured, web search disabled");
        None
    };

    Providers {
        completion: Arc::new(completion),
        search,
    }
}

/// Human-facing label for a provider name, used in relayed error messages.
pub fn display_name(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "OpenRouter".into(),
        "openai" => "OpenAI".into(),
        "ollama" => "Ollama".into(),
        "vllm" => "vLLM".into(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "Provider".into(),
            }
        }
    }
}
