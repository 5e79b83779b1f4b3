//! Chat orchestration — one inbound request, one completion call.
//!
//! Flow:
//!
//! 1. Validate the model and the conversation
//! 2. Refuse early when the completion credential is missing
//! 3. Temporal context (when enabled)
//! 4. Web search (search mode only); any failure degrades to no augmentation
//! 5. Assemble and send, exactly once

use std::sync::Arc;

use chrono::NaiveDateTime;
use concierge_core::error::{Error, Result};
use concierge_core::message::Message;
use concierge_core::provider::{Provider, ProviderRequest, Usage};
use concierge_core::search::{SearchProvider, SearchResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::{AssemblyInput, assemble};
use crate::decision;
use crate::knowledge::{KnowledgeBase, KnowledgeStore};
use crate::search_context::format_search_context;
use crate::temporal;

/// Which augmentations a request may receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Temporal context only
    Plain,
    /// Temporal context plus web search
    WithSearch,
}

/// An inbound chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatInput {
    /// Requested model; required (clients read the default from the primary document's `modelId`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// The whole conversation, current user turn last
    pub messages: Vec<Message>,
}

/// A cited search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub url: String,
}

/// What the search step did for this request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub search_performed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SearchSource>,
}

impl SearchMetadata {
    fn skipped() -> Self {
        Self::default()
    }

    fn from_response(response: &SearchResponse) -> Self {
        Self {
            search_performed: true,
            query: Some(response.query.clone()),
            results_count: Some(response.result_count),
            sources: response
                .results
                .iter()
                .map(|r| SearchSource {
                    title: r.title.clone(),
                    url: r.url.clone(),
                })
                .collect(),
        }
    }
}

/// The completed exchange.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub message: Message,
    pub model: String,
    pub usage: Option<Usage>,
    /// Present in search mode only
    pub search: Option<SearchMetadata>,
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Runs chat requests against the current knowledge snapshot.
pub struct ChatPipeline {
    knowledge: Arc<KnowledgeStore>,
    provider: Arc<dyn Provider>,
    search: Option<Arc<dyn SearchProvider>>,
    completion_configured: bool,
    temporal_enabled: bool,
    clock: Clock,
}

impl ChatPipeline {
    pub fn new(knowledge: Arc<KnowledgeStore>, provider: Arc<dyn Provider>) -> Self {
        Self {
            knowledge,
            provider,
            search: None,
            completion_configured: true,
            temporal_enabled: true,
            clock: Arc::new(|| temporal::now(None)),
        }
    }

    pub fn with_search(mut self, search: Option<Arc<dyn SearchProvider>>) -> Self {
        self.search = search;
        self
    }

    /// Whether the completion credential is present.
    pub fn with_completion_configured(mut self, configured: bool) -> Self {
        self.completion_configured = configured;
        self
    }

    pub fn with_temporal(mut self, enabled: bool, utc_offset_minutes: Option<i32>) -> Self {
        self.temporal_enabled = enabled;
        self.clock = Arc::new(move || temporal::now(utc_offset_minutes));
        self
    }

    /// Override the clock used for temporal context.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    pub fn search_configured(&self) -> bool {
        self.search.as_ref().is_some_and(|s| s.is_configured())
    }

    pub fn completion_configured(&self) -> bool {
        self.completion_configured
    }

    /// Run one request.
    pub async fn run(&self, input: ChatInput, mode: ChatMode) -> Result<ChatOutcome> {
        let snapshot = self.knowledge.snapshot();
        let model = resolve_model(&input)?;

        let Some((current, history)) = input.messages.split_last() else {
            return Err(Error::Validation("messages must not be empty".into()));
        };
        if !current.is_user() {
            return Err(Error::Validation("Last message must be from user".into()));
        }

        if !self.completion_configured {
            return Err(Error::NotConfigured(format!(
                "{} API key",
                self.provider.name()
            )));
        }

        let temporal_context = self
            .temporal_enabled
            .then(|| temporal::compute((self.clock)()).render());

        let (search_context, search) = match mode {
            ChatMode::Plain => (None, None),
            ChatMode::WithSearch => {
                let (context, metadata) = self.augment(&current.content, &snapshot).await;
                (context, Some(metadata))
            }
        };

        let system_prompts = snapshot.system_prompts();
        let messages = assemble(&AssemblyInput {
            system_prompts: &system_prompts,
            history,
            temporal_context: temporal_context.as_deref(),
            search_context: search_context.as_deref(),
            user_message: &current.content,
        });

        debug!(
            model = %model,
            messages = messages.len(),
            searched = search.as_ref().is_some_and(|s| s.search_performed),
            "Sending assembled conversation"
        );

        let response = self
            .provider
            .complete(ProviderRequest { model, messages })
            .await
            .inspect_err(|e| warn!(error = %e, "Completion failed"))?;

        Ok(ChatOutcome {
            message: response.message,
            model: response.model,
            usage: response.usage,
            search,
        })
    }

    /// Decide, search, and format. Never fails.
    async fn augment(
        &self,
        user_message: &str,
        snapshot: &KnowledgeBase,
    ) -> (Option<String>, SearchMetadata) {
        let Some(search) = self.search.as_ref().filter(|s| s.is_configured()) else {
            debug!("No search provider configured");
            return (None, SearchMetadata::skipped());
        };

        let config = snapshot.web_search();
        if !decision::should_search(user_message, config) {
            return (None, SearchMetadata::skipped());
        }
        let Some(query) = decision::extract_search_query(user_message) else {
            return (None, SearchMetadata::skipped());
        };
        let options = decision::search_options(user_message, config);

        match search.search(query.as_str(), &options).await {
            Ok(response) => {
                info!(query = %query, results = response.result_count, "Web search completed");
                (format_search_context(&response), SearchMetadata::from_response(&response))
            }
            Err(e) => {
                warn!(error = %e, query = %query, "Web search failed, continuing without it");
                (None, SearchMetadata::skipped())
            }
        }
    }
}

fn resolve_model(input: &ChatInput) -> Result<String> {
    input
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::Validation("model is required".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use concierge_config::{PrimaryDocument, WebSearchConfig};
    use concierge_core::error::{ProviderError, SearchError};
    use concierge_core::message::Role;
    use concierge_core::provider::ProviderResponse;
    use concierge_core::search::{SearchOptions, SearchResult};
    use std::sync::Mutex;

    /// Records every request and answers with a fixed reply.
    struct RecordingProvider {
        requests: Mutex<Vec<ProviderRequest>>,
        fail_with: Option<ProviderError>,
    }

    impl RecordingProvider {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail_with: None,
            })
        }

        fn failing(err: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail_with: Some(err),
            })
        }

        fn last_request(&self) -> ProviderRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "openrouter"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(ProviderResponse {
                message: Message::assistant("Risposta"),
                usage: None,
                model: request.model,
            })
        }
    }

    struct StubSearch {
        result: std::result::Result<SearchResponse, SearchError>,
        calls: Mutex<Vec<(String, SearchOptions)>>,
    }

    impl StubSearch {
        fn with(result: std::result::Result<SearchResponse, SearchError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        fn name(&self) -> &str {
            "stub"
        }

        async fn search(
            &self,
            query: &str,
            options: &SearchOptions,
        ) -> std::result::Result<SearchResponse, SearchError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), options.clone()));
            self.result.clone()
        }
    }

    fn weather_response() -> SearchResponse {
        SearchResponse {
            query: "What's weather today Rome".into(),
            answer: Some("Sunny".into()),
            results: vec![SearchResult {
                title: "Rome weather".into(),
                url: "https://weather.example/rome".into(),
                content: "Sunny, 28°C".into(),
                score: 0.9,
                favicon: None,
            }],
            result_count: 1,
            response_time: Some(0.4),
        }
    }

    fn knowledge(search_enabled: bool) -> Arc<KnowledgeStore> {
        let document = PrimaryDocument {
            model_id: Some("openai/gpt-4o-mini".into()),
            web_search: WebSearchConfig {
                enabled: search_enabled,
                ..WebSearchConfig::default()
            },
            system_prompt: Some("Regole".into()),
            extra: concierge_core::KnowledgeConfig::Mapping(Vec::new()),
        };
        Arc::new(KnowledgeStore::fixed(KnowledgeBase::new(
            document,
            Some(&"Menu".into()),
        )))
    }

    fn july_evening() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 7, 11)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn pipeline(provider: Arc<RecordingProvider>, search_enabled: bool) -> ChatPipeline {
        ChatPipeline::new(knowledge(search_enabled), provider).with_clock(july_evening)
    }

    fn input(messages: Vec<Message>) -> ChatInput {
        ChatInput {
            model: Some("openai/gpt-4o-mini".into()),
            messages,
        }
    }

    #[tokio::test]
    async fn plain_chat_adds_prompts_history_and_temporal() {
        let provider = RecordingProvider::ok();
        let outcome = pipeline(provider.clone(), true)
            .run(
                input(vec![
                    Message::user("Ciao"),
                    Message::assistant("Benvenuto"),
                    Message::user("Siete aperti stasera?"),
                ]),
                ChatMode::Plain,
            )
            .await
            .unwrap();

        assert_eq!(outcome.message.content, "Risposta");
        assert!(outcome.search.is_none());

        let request = provider.last_request();
        assert_eq!(request.model, "openai/gpt-4o-mini");
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::System,
                Role::User,
                Role::Assistant,
                Role::System,
                Role::User
            ]
        );
        assert_eq!(request.messages[0].content, "Regole");
        assert_eq!(request.messages[1].content, "Menu");
        assert!(request.messages[4].content.contains("in orario di servizio"));
        assert_eq!(request.messages[5].content, "Siete aperti stasera?");
    }

    #[tokio::test]
    async fn search_results_are_inserted_before_user_turn() {
        let provider = RecordingProvider::ok();
        let search = StubSearch::with(Ok(weather_response()));
        let outcome = pipeline(provider.clone(), true)
            .with_search(Some(search.clone()))
            .run(
                input(vec![Message::user("What's the weather today in Rome")]),
                ChatMode::WithSearch,
            )
            .await
            .unwrap();

        let metadata = outcome.search.unwrap();
        assert!(metadata.search_performed);
        assert_eq!(metadata.results_count, Some(1));
        assert_eq!(metadata.sources[0].url, "https://weather.example/rome");

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.depth, concierge_core::SearchDepth::Advanced);

        let request = provider.last_request();
        let n = request.messages.len();
        assert!(request.messages[n - 2].content.starts_with("Informazioni aggiornate dal web"));
        assert!(request.messages[n - 3].content.starts_with("=== CONTESTO TEMPORALE"));
        assert!(request.messages[n - 1].is_user());
    }

    #[tokio::test]
    async fn search_failure_degrades_gracefully() {
        let provider = RecordingProvider::ok();
        let search = StubSearch::with(Err(SearchError::Timeout { timeout_ms: 5000 }));
        let outcome = pipeline(provider.clone(), true)
            .with_search(Some(search))
            .run(
                input(vec![Message::user("What's the weather today in Rome")]),
                ChatMode::WithSearch,
            )
            .await
            .unwrap();

        assert!(!outcome.search.unwrap().search_performed);
        let request = provider.last_request();
        assert!(
            !request
                .messages
                .iter()
                .any(|m| m.content.starts_with("Informazioni aggiornate"))
        );
    }

    #[tokio::test]
    async fn booking_message_never_searches() {
        let provider = RecordingProvider::ok();
        let search = StubSearch::with(Ok(weather_response()));
        let outcome = pipeline(provider, true)
            .with_search(Some(search.clone()))
            .run(
                input(vec![Message::user("Vorrei prenotare un tavolo per stasera")]),
                ChatMode::WithSearch,
            )
            .await
            .unwrap();

        assert!(!outcome.search.unwrap().search_performed);
        assert!(search.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn plain_mode_never_searches() {
        let search = StubSearch::with(Ok(weather_response()));
        pipeline(RecordingProvider::ok(), true)
            .with_search(Some(search.clone()))
            .run(
                input(vec![Message::user("What's the weather today in Rome")]),
                ChatMode::Plain,
            )
            .await
            .unwrap();
        assert!(search.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_message_must_be_user() {
        let provider = RecordingProvider::ok();
        let err = pipeline(provider.clone(), false)
            .run(
                input(vec![Message::user("Ciao"), Message::assistant("Salve")]),
                ChatMode::Plain,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("from user")));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn empty_conversation_is_rejected() {
        let err = pipeline(RecordingProvider::ok(), false)
            .run(input(vec![]), ChatMode::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn missing_model_is_rejected_even_with_document_model() {
        let provider = RecordingProvider::ok();
        for model in [None, Some("   ".to_string())] {
            let err = pipeline(provider.clone(), false)
                .run(
                    ChatInput {
                        model,
                        messages: vec![Message::user("Ciao")],
                    },
                    ChatMode::Plain,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(ref m) if m == "model is required"));
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn request_model_is_sent_trimmed() {
        let provider = RecordingProvider::ok();
        let outcome = pipeline(provider.clone(), false)
            .run(
                ChatInput {
                    model: Some(" anthropic/claude-sonnet-4 ".into()),
                    messages: vec![Message::user("Ciao")],
                },
                ChatMode::Plain,
            )
            .await
            .unwrap();
        assert_eq!(outcome.model, "anthropic/claude-sonnet-4");
        assert_eq!(provider.last_request().model, "anthropic/claude-sonnet-4");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_outbound_call() {
        let provider = RecordingProvider::ok();
        let err = pipeline(provider.clone(), false)
            .with_completion_configured(false)
            .run(input(vec![Message::user("Ciao")]), ChatMode::Plain)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "openrouter API key not configured");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_error_is_propagated_once() {
        let provider = RecordingProvider::failing(ProviderError::ApiError {
            status_code: 429,
            message: "rate limited".into(),
        });
        let err = pipeline(provider.clone(), false)
            .run(input(vec![Message::user("Ciao")]), ChatMode::Plain)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::ApiError { status_code: 429, .. })
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn temporal_context_can_be_disabled() {
        let provider = RecordingProvider::ok();
        pipeline(provider.clone(), false)
            .with_temporal(false, None)
            .run(input(vec![Message::user("Ciao")]), ChatMode::Plain)
            .await
            .unwrap();
        let request = provider.last_request();
        assert_eq!(request.messages.len(), 3);
        assert!(!request.messages.iter().any(|m| m.content.contains("CONTESTO TEMPORALE")));
    }
}
