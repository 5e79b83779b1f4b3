//! Configuration loading, validation, and management for Concierge.
//!
//! Two layers of configuration exist:
//!
//! - **Process configuration** ([`AppConfig`]) — `~/.concierge/config.toml`
//!   with environment variable overrides: credentials, endpoints, gateway
//!   bind address, and where the knowledge documents live.
//! - **Knowledge documents** ([`knowledge`]) — the JSON documents the system
//!   prompt is rendered from, plus the web-search tuning knobs.

pub mod knowledge;

pub use knowledge::{CategoryWeights, PrimaryDocument, WebSearchConfig, load_secondary};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.concierge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion-provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Search-provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,

    /// Completion provider endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Search provider endpoint
    #[serde(default)]
    pub search: SearchConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge document locations
    #[serde(default)]
    pub knowledge: KnowledgePaths,

    /// Temporal context settings
    #[serde(default)]
    pub temporal: TemporalConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("search_api_key", &redact(&self.search_api_key))
            .field("provider", &self.provider)
            .field("search", &self.search)
            .field("gateway", &self.gateway)
            .field("knowledge", &self.knowledge)
            .field("temporal", &self.temporal)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openrouter".into()
}
fn default_provider_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_provider_url(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,

    /// Hard budget for one search call, in milliseconds
    #[serde(default = "default_search_timeout")]
    pub timeout_ms: u64,
}

fn default_search_url() -> String {
    "https://api.tavily.com".into()
}
fn default_search_timeout() -> u64 {
    5_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            timeout_ms: default_search_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgePaths {
    /// Primary document: model id, behaviour rules, web-search knobs
    #[serde(default = "default_primary_path")]
    pub primary_path: PathBuf,

    /// Optional secondary document: domain knowledge base
    #[serde(default = "default_secondary_path", skip_serializing_if = "Option::is_none")]
    pub secondary_path: Option<PathBuf>,
}

fn default_primary_path() -> PathBuf {
    AppConfig::config_dir().join("main-config.json")
}
fn default_secondary_path() -> Option<PathBuf> {
    Some(AppConfig::config_dir().join("specific-config.json"))
}

impl Default for KnowledgePaths {
    fn default() -> Self {
        Self {
            primary_path: default_primary_path(),
            secondary_path: default_secondary_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Inject the operational-status message into every request
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fixed offset from UTC for the operating calendar; Italian time (CET/CEST) when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

fn default_true() -> bool {
    true
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            utc_offset_minutes: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.concierge/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CONCIERGE_API_KEY`, then `OPENROUTER_API_KEY` (completion key)
    /// - `TAVILY_API_KEY` (search key)
    /// - `CONCIERGE_PRIMARY_CONFIG` / `CONCIERGE_SECONDARY_CONFIG`
    /// - `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("CONCIERGE_API_KEY").or_else(|| non_empty("OPENROUTER_API_KEY"));
        }

        if self.search_api_key.is_none() {
            self.search_api_key = non_empty("TAVILY_API_KEY");
        }

        if let Some(path) = non_empty("CONCIERGE_PRIMARY_CONFIG") {
            self.knowledge.primary_path = PathBuf::from(path);
        }

        if let Some(path) = non_empty("CONCIERGE_SECONDARY_CONFIG") {
            self.knowledge.secondary_path = Some(PathBuf::from(path));
        }

        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT override"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".concierge")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "search.timeout_ms must be > 0".into(),
            ));
        }

        if let Some(offset) = self.temporal.utc_offset_minutes {
            if offset.abs() > 14 * 60 {
                return Err(ConfigError::ValidationError(
                    "temporal.utc_offset_minutes must be within ±840".into(),
                ));
            }
        }

        Ok(())
    }

    /// Check if a completion API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn has_search_api_key(&self) -> bool {
        self.search_api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_api_key: None,
            provider: ProviderConfig::default(),
            search: SearchConfig::default(),
            gateway: GatewayConfig::default(),
            knowledge: KnowledgePaths::default(),
            temporal: TemporalConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
