//! Knowledge documents — the JSON files the system prompt is rendered from.
//!
//! The **primary** document carries the model id, the behaviour rules
//! (`systemPrompt`), and the web-search knobs (`webSearch`). Any other
//! top-level keys are knowledge too and render after the behaviour rules.
//! The optional **secondary** document is a pure knowledge base.

use concierge_core::KnowledgeConfig;
use concierge_core::SearchDepth;
use concierge_core::search::MAX_SEARCH_RESULTS;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Keys of the primary document that are settings, not prompt content.
pub const RESERVED_KEYS: &[&str] = &["modelId", "systemPrompt", "webSearch"];

/// Prompt used when the primary document is missing or unreadable.
pub const FALLBACK_SYSTEM_PROMPT: &str = "Sei un assistente virtuale di nome Marios Brazil, utile, cortese e competente. Il tuo scopo è aiutare gli utenti fornendo informazioni accurate, assistenza con compiti specifici e mantenendo una conversazione amichevole e professionale.";

// ── Web search settings ───────────────────────────────────────────────────

/// Tuning for the search decision engine (`webSearch` in the primary document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Score at or above which a search is performed
    #[serde(default = "default_threshold", alias = "intelligentThreshold")]
    pub threshold: f64,

    /// Results per search; 0 or unusable values mean the default, capped at 10
    #[serde(default = "default_max_results", deserialize_with = "lenient_max_results")]
    pub max_results: u8,

    #[serde(default)]
    pub search_depth: SearchDepth,

    /// Case-insensitive substrings that veto a search outright
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Case-insensitive substrings that add to the score
    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub weights: CategoryWeights,
}

fn default_threshold() -> f64 {
    2.5
}
fn default_max_results() -> u8 {
    5
}

/// A malformed value falls back to the default instead of failing the document.
fn lenient_max_results<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) if n.is_finite() && n >= 1.0 => n.min(f64::from(MAX_SEARCH_RESULTS)) as u8,
        Raw::Number(_) | Raw::Other(_) => default_max_results(),
    })
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_threshold(),
            max_results: default_max_results(),
            search_depth: SearchDepth::Basic,
            exclude_patterns: Vec::new(),
            triggers: Vec::new(),
            weights: CategoryWeights::default(),
        }
    }
}

impl WebSearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "webSearch.threshold must be a non-negative number".into(),
            ));
        }
        if self.weights.iter().any(|(_, w)| !w.is_finite() || w < 0.0) {
            return Err(ConfigError::ValidationError(
                "webSearch.weights must be non-negative numbers".into(),
            ));
        }
        Ok(())
    }
}

/// Per-category scoring weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeights {
    #[serde(default = "w_temporal")]
    pub temporal: f64,
    #[serde(default = "w_real_time")]
    pub real_time: f64,
    #[serde(default = "w_temporal_composite")]
    pub temporal_composite: f64,
    #[serde(default = "w_pricing")]
    pub pricing: f64,
    #[serde(default = "w_news")]
    pub news: f64,
    #[serde(default = "w_keyword_trigger")]
    pub keyword_trigger: f64,
}

fn w_temporal() -> f64 {
    2.0
}
fn w_real_time() -> f64 {
    2.5
}
fn w_temporal_composite() -> f64 {
    3.0
}
fn w_pricing() -> f64 {
    2.5
}
fn w_news() -> f64 {
    2.5
}
fn w_keyword_trigger() -> f64 {
    1.0
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            temporal: w_temporal(),
            real_time: w_real_time(),
            temporal_composite: w_temporal_composite(),
            pricing: w_pricing(),
            news: w_news(),
            keyword_trigger: w_keyword_trigger(),
        }
    }
}

impl CategoryWeights {
    /// `(wire name, weight)` pairs in scoring order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("temporal", self.temporal),
            ("realTime", self.real_time),
            ("temporalComposite", self.temporal_composite),
            ("pricing", self.pricing),
            ("news", self.news),
            ("keywordTrigger", self.keyword_trigger),
        ]
        .into_iter()
    }
}

// ── Primary document ──────────────────────────────────────────────────────

/// The settings half of the primary document, parsed with types.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryHeader {
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    web_search: WebSearchConfig,
}

/// A parsed primary knowledge document.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryDocument {
    /// Default completion model; blank ids are treated as absent
    pub model_id: Option<String>,

    pub web_search: WebSearchConfig,

    /// The `systemPrompt` value, if present and non-empty
    pub system_prompt: Option<KnowledgeConfig>,

    /// Every other top-level key, in document order
    pub extra: KnowledgeConfig,
}

impl PrimaryDocument {
    /// Parse a primary document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let header: PrimaryHeader = serde_json::from_str(text)
            .map_err(|e| ConfigError::ValidationError(format!("primary document: {e}")))?;
        // Parsed straight from text so mapping order follows the document.
        let content: KnowledgeConfig = serde_json::from_str(text)
            .map_err(|e| ConfigError::ValidationError(format!("primary document: {e}")))?;

        if !matches!(content, KnowledgeConfig::Mapping(_)) {
            return Err(ConfigError::ValidationError(
                "primary document must be a JSON object".into(),
            ));
        }
        header.web_search.validate()?;

        Ok(Self {
            model_id: header.model_id.filter(|id| !id.trim().is_empty()),
            web_search: header.web_search,
            system_prompt: content
                .get("systemPrompt")
                .filter(|v| !v.is_empty())
                .cloned(),
            extra: content.without_keys(RESERVED_KEYS),
        })
    }

    /// Read and parse a primary document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load from disk, degrading to [`PrimaryDocument::fallback`] on any failure.
    pub fn load_or_fallback(path: &Path) -> Self {
        match Self::load(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "Primary knowledge document unavailable, using built-in prompt");
                Self::fallback()
            }
        }
    }

    /// Built-in prompt, no model id, web search disabled.
    pub fn fallback() -> Self {
        Self {
            model_id: None,
            web_search: WebSearchConfig::default(),
            system_prompt: Some(KnowledgeConfig::from(FALLBACK_SYSTEM_PROMPT)),
            extra: KnowledgeConfig::Mapping(Vec::new()),
        }
    }

    /// Non-empty prompt parts in render order: behaviour rules, then knowledge.
    pub fn prompt_parts(&self) -> Vec<&KnowledgeConfig> {
        self.system_prompt
            .iter()
            .chain(std::iter::once(&self.extra))
            .filter(|part| !part.is_empty())
            .collect()
    }
}

// ── Secondary document ────────────────────────────────────────────────────

/// Load the optional secondary document.
///
/// A missing file is `Ok(None)`. The document's `systemPrompt` entry is used
/// when present, otherwise the whole document.
pub fn load_secondary(path: &Path) -> Result<Option<KnowledgeConfig>, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No secondary knowledge document");
        return Ok(None);
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let doc: KnowledgeConfig = serde_json::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let knowledge = match doc.get("systemPrompt") {
        Some(inner) => inner.clone(),
        None => doc,
    };
    Ok(Some(knowledge).filter(|k| !k.is_empty()))
}

// ── Samples (for `onboard`) ───────────────────────────────────────────────

pub const SAMPLE_PRIMARY: &str = r#"{
  "modelId": "openai/gpt-4o-mini",
  "systemPrompt": {
    "identity": "Sei Marios Brazil, l'assistente virtuale del ristorante.",
    "tone": ["Cortese", "Conciso", "Rispondi nella lingua dell'utente"],
    "bookingRules": "Le prenotazioni si accettano solo per il periodo di apertura."
  },
  "webSearch": {
    "enabled": true,
    "intelligentThreshold": 2.5,
    "maxResults": 5,
    "searchDepth": "basic",
    "excludePatterns": ["allergeni"]
  }
}
"#;

pub const SAMPLE_SECONDARY: &str = r#"{
  "systemPrompt": {
    "restaurant": {
      "name": "Marios Brazil",
      "openingPeriod": "15 Maggio - 15 Settembre",
      "serviceHours": ["Pranzo 12:30 - 15:00", "Cena 19:30 - 22:00"]
    },
    "menu": [
      {"name": "Picanha", "description": "Taglio brasiliano alla griglia"},
      {"name": "Feijoada", "description": "Stufato di fagioli neri"}
    ]
  }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_document_splits_settings_from_prompt() {
        let doc = PrimaryDocument::from_json(
            r#"{"modelId": "openai/gpt-4o", "systemPrompt": "Sii gentile.", "hours": {"lunch": "12:30"}, "webSearch": {"enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(doc.model_id.as_deref(), Some("openai/gpt-4o"));
        assert!(doc.web_search.enabled);
        assert_eq!(doc.system_prompt, Some(KnowledgeConfig::from("Sii gentile.")));
        assert!(doc.extra.get("hours").is_some());
        assert!(doc.extra.get("webSearch").is_none());
        assert_eq!(doc.prompt_parts().len(), 2);
    }

    #[test]
    fn web_search_defaults_and_legacy_threshold_name() {
        let doc = PrimaryDocument::from_json(r#"{"webSearch": {"intelligentThreshold": 1.5}}"#).unwrap();
        assert!(!doc.web_search.enabled);
        assert_eq!(doc.web_search.threshold, 1.5);
        assert_eq!(doc.web_search.max_results, 5);
        assert_eq!(doc.web_search.weights.temporal_composite, 3.0);

        let bare = PrimaryDocument::from_json("{}").unwrap();
        assert_eq!(bare.web_search, WebSearchConfig::default());
        assert!(bare.model_id.is_none());
        assert!(bare.prompt_parts().is_empty());
    }

    #[test]
    fn max_results_is_clamped_instead_of_rejected() {
        let doc = PrimaryDocument::from_json(
            r#"{"modelId": "m", "systemPrompt": "Regole", "webSearch": {"enabled": true, "maxResults": 300}}"#,
        )
        .unwrap();
        assert_eq!(doc.web_search.max_results, 10);
        assert_eq!(doc.model_id.as_deref(), Some("m"));
        assert!(doc.web_search.enabled);

        let float = PrimaryDocument::from_json(r#"{"webSearch": {"maxResults": 3.0}}"#).unwrap();
        assert_eq!(float.web_search.max_results, 3);
    }

    #[test]
    fn zero_or_null_max_results_means_default() {
        for value in ["0", "-2", "null", "\"many\""] {
            let doc = PrimaryDocument::from_json(&format!(r#"{{"webSearch": {{"maxResults": {value}}}}}"#))
                .unwrap();
            assert_eq!(doc.web_search.max_results, 5, "maxResults: {value}");
        }
    }

    #[test]
    fn weight_overrides_are_partial() {
        let doc = PrimaryDocument::from_json(
            r#"{"webSearch": {"enabled": true, "weights": {"news": 4.0}, "searchDepth": "advanced"}}"#,
        )
        .unwrap();
        assert_eq!(doc.web_search.weights.news, 4.0);
        assert_eq!(doc.web_search.weights.pricing, 2.5);
        assert_eq!(doc.web_search.search_depth, SearchDepth::Advanced);
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(PrimaryDocument::from_json(r#"{"webSearch": {"threshold": -1}}"#).is_err());
    }

    #[test]
    fn non_object_primary_rejected() {
        assert!(PrimaryDocument::from_json(r#"["a", "b"]"#).is_err());
        assert!(PrimaryDocument::from_json("not json").is_err());
    }

    #[test]
    fn blank_model_id_is_absent() {
        let doc = PrimaryDocument::from_json(r#"{"modelId": "  "}"#).unwrap();
        assert!(doc.model_id.is_none());
    }

    #[test]
    fn missing_primary_falls_back() {
        let doc = PrimaryDocument::load_or_fallback(Path::new("/nonexistent/main-config.json"));
        assert_eq!(doc, PrimaryDocument::fallback());
        assert!(!doc.web_search.enabled);
        assert_eq!(
            doc.prompt_parts(),
            vec![&KnowledgeConfig::from(FALLBACK_SYSTEM_PROMPT)]
        );
    }

    #[test]
    fn malformed_primary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main-config.json");
        std::fs::write(&path, "{\"modelId\": ").unwrap();
        assert!(matches!(
            PrimaryDocument::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
        assert_eq!(PrimaryDocument::load_or_fallback(&path), PrimaryDocument::fallback());
    }

    #[test]
    fn secondary_uses_system_prompt_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specific-config.json");
        std::fs::write(&path, r#"{"systemPrompt": {"menu": ["pizza"]}, "ignored": "x"}"#).unwrap();
        let doc = load_secondary(&path).unwrap().unwrap();
        assert!(doc.get("menu").is_some());
        assert!(doc.get("ignored").is_none());
    }

    #[test]
    fn secondary_without_system_prompt_is_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specific-config.json");
        std::fs::write(&path, r#"{"menu": ["pizza"]}"#).unwrap();
        let doc = load_secondary(&path).unwrap().unwrap();
        assert!(doc.get("menu").is_some());
    }

    #[test]
    fn missing_secondary_is_none() {
        assert!(load_secondary(Path::new("/nonexistent/specific.json")).unwrap().is_none());
    }

    #[test]
    fn malformed_secondary_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specific-config.json");
        std::fs::write(&path, "{oops").unwrap();
        assert!(load_secondary(&path).is_err());
    }

    #[test]
    fn samples_parse() {
        let primary = PrimaryDocument::from_json(SAMPLE_PRIMARY).unwrap();
        assert!(primary.web_search.enabled);
        let secondary: KnowledgeConfig = serde_json::from_str(SAMPLE_SECONDARY).unwrap();
        assert!(secondary.get("systemPrompt").is_some());
    }
}
