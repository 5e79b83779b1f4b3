//! Knowledge snapshots — loaded documents plus their rendered prompts.
//!
//! A [`KnowledgeBase`] is immutable once built. [`KnowledgeStore`] hands out
//! `Arc` snapshots and swaps in a freshly loaded one on [`KnowledgeStore::reload`],
//! so in-flight requests keep the snapshot they started with.

use std::sync::{Arc, RwLock};

use concierge_config::{KnowledgePaths, PrimaryDocument, WebSearchConfig, load_secondary};
use concierge_core::KnowledgeConfig;
use tracing::{info, warn};

use crate::prompt::{RenderedPrompt, render_document};

/// One immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    document: PrimaryDocument,
    prompt: RenderedPrompt,
}

impl KnowledgeBase {
    /// Load both documents. Never fails: a broken primary document degrades
    /// to the built-in prompt, a broken secondary one is skipped.
    pub fn load(paths: &KnowledgePaths) -> Self {
        let document = PrimaryDocument::load_or_fallback(&paths.primary_path);

        let secondary = paths.secondary_path.as_deref().and_then(|path| {
            load_secondary(path).unwrap_or_else(|e| {
                warn!(error = %e, "Secondary knowledge document skipped");
                None
            })
        });

        Self::new(document, secondary.as_ref())
    }

    pub fn new(document: PrimaryDocument, secondary: Option<&KnowledgeConfig>) -> Self {
        let prompt = render_document(&document, secondary);
        Self { document, prompt }
    }

    /// Built-in prompt, no model, web search disabled.
    pub fn fallback() -> Self {
        Self::new(PrimaryDocument::fallback(), None)
    }

    pub fn model_id(&self) -> Option<&str> {
        self.document.model_id.as_deref()
    }

    pub fn web_search(&self) -> &WebSearchConfig {
        &self.document.web_search
    }

    pub fn prompt(&self) -> &RenderedPrompt {
        &self.prompt
    }

    /// System prompts in message order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.prompt.system_prompts()
    }
}

/// Shared holder of the current [`KnowledgeBase`].
#[derive(Debug)]
pub struct KnowledgeStore {
    paths: Option<KnowledgePaths>,
    current: RwLock<Arc<KnowledgeBase>>,
}

impl KnowledgeStore {
    /// Load from disk; [`reload`](Self::reload) re-reads the same paths.
    pub fn open(paths: KnowledgePaths) -> Self {
        let base = KnowledgeBase::load(&paths);
        info!(
            primary = %paths.primary_path.display(),
            model = base.model_id().unwrap_or("-"),
            web_search = base.web_search().enabled,
            "Knowledge loaded"
        );
        Self {
            paths: Some(paths),
            current: RwLock::new(Arc::new(base)),
        }
    }

    /// A store pinned to an in-memory snapshot.
    pub fn fixed(base: KnowledgeBase) -> Self {
        Self {
            paths: None,
            current: RwLock::new(Arc::new(base)),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the documents and atomically replace the snapshot.
    pub fn reload(&self) -> Arc<KnowledgeBase> {
        let Some(paths) = self.paths.as_ref() else {
            return self.snapshot();
        };

        let fresh = Arc::new(KnowledgeBase::load(paths));
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&fresh);
        info!(model = fresh.model_id().unwrap_or("-"), "Knowledge reloaded");
        fresh
    }
}
