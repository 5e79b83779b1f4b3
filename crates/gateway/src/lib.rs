//! HTTP API gateway for Concierge.
//!
//! Exposes the chat pipeline under `/api`: plain chat, chat with web
//! search, health, and public client configuration.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use concierge_pipeline::{ChatPipeline, KnowledgeStore};

/// Build the full router.
///
/// Layers applied:
/// - Permissive CORS (the chat widget is served from anywhere)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: api::SharedApiState) -> Router {
    Router::new()
        .nest("/api", api::api_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the shared pipeline from configuration.
pub fn build_pipeline(config: &concierge_config::AppConfig) -> ChatPipeline {
    let providers = concierge_providers::build_from_config(config);
    let knowledge = Arc::new(KnowledgeStore::open(config.knowledge.clone()));

    ChatPipeline::new(knowledge, providers.completion)
        .with_search(providers.search)
        .with_completion_configured(config.has_api_key())
        .with_temporal(config.temporal.enabled, config.temporal.utc_offset_minutes)
}

/// Start the gateway HTTP server.
///
/// Runs until Ctrl-C. On unix, `SIGHUP` reloads the knowledge documents.
pub async fn start(config: concierge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let pipeline = Arc::new(build_pipeline(&config));

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(pipeline.knowledge()))?;

    let state = Arc::new(api::ApiState {
        pipeline: Arc::clone(&pipeline),
    });
    let app = build_router(state);

    info!(
        addr = %addr,
        provider = pipeline.provider_name(),
        completion = pipeline.completion_configured(),
        search = pipeline.search_configured(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
fn spawn_reload_on_hangup(knowledge: Arc<KnowledgeStore>) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            knowledge.reload();
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use concierge_core::error::ProviderError;
    use concierge_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use concierge_pipeline::KnowledgeBase;
    use tower::ServiceExt;

    struct Unused;

    #[async_trait::async_trait]
    impl Provider for Unused {
        fn name(&self) -> &str {
            "openrouter"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Network("unused".into()))
        }
    }

    fn app() -> Router {
        let knowledge = Arc::new(KnowledgeStore::fixed(KnowledgeBase::fallback()));
        let pipeline = ChatPipeline::new(knowledge, Arc::new(Unused));
        build_router(Arc::new(api::ApiState {
            pipeline: Arc::new(pipeline),
        }))
    }

    #[tokio::test]
    async fn api_is_nested() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let big = format!(
            r#"{{"model":"m","messages":[{{"role":"user","content":"{}"}}]}}"#,
            "a".repeat(2 * 1024 * 1024)
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(big))
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/chat")
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }
}
