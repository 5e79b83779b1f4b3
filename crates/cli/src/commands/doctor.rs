//! `concierge doctor` — Diagnose configuration, credentials, and documents.

use std::path::Path;

use concierge_config::{AppConfig, PrimaryDocument, load_secondary};
use concierge_core::error::ProviderError;
use concierge_core::provider::Provider;
use concierge_providers::{build_from_config, display_name};

/// Outcome of one check.
#[derive(Debug, PartialEq)]
enum Check {
    Ok(String),
    Warn(String),
    Fail(String),
}

impl Check {
    fn is_issue(&self) -> bool {
        !matches!(self, Self::Ok(_))
    }

    fn line(&self) -> String {
        match self {
            Self::Ok(m) => format!("  ✅ {m}"),
            Self::Warn(m) => format!("  ⚠️  {m}"),
            Self::Fail(m) => format!("  ❌ {m}"),
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Concierge Doctor — Configuration Diagnostics");
    println!("==============================================\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    let mut checks = Vec::new();

    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                checks.push(Check::Ok("Config file valid".into()));
                config
            }
            Err(e) => {
                checks.push(Check::Fail(format!("Config file invalid: {e}")));
                AppConfig::default()
            }
        }
    } else {
        checks.push(Check::Warn(
            "No config file — run `concierge onboard` (using defaults)".into(),
        ));
        AppConfig::default()
    };

    checks.extend(check_config(&config));
    if config.has_api_key() {
        let providers = build_from_config(&config);
        checks.push(check_credentials(providers.completion.as_ref()).await);
    }

    for check in &checks {
        println!("{}", check.line());
    }

    let issues = checks.iter().filter(|c| c.is_issue()).count();
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> Vec<Check> {
    let provider = display_name(&config.provider.name);
    let mut checks = vec![
        if config.has_api_key() {
            Check::Ok(format!("{provider} API key configured"))
        } else {
            Check::Fail(format!(
                "No {provider} API key — set OPENROUTER_API_KEY or api_key in config.toml"
            ))
        },
        if config.has_search_api_key() {
            Check::Ok("Tavily API key configured".into())
        } else {
            Check::Warn("No Tavily API key — web search unavailable".into())
        },
    ];

    checks.push(check_primary(&config.knowledge.primary_path));
    if let Some(path) = config.knowledge.secondary_path.as_deref() {
        checks.push(check_secondary(path));
    }
    checks
}

/// Ask the completion endpoint whether it accepts the configured key.
async fn check_credentials(provider: &dyn Provider) -> Check {
    let label = display_name(provider.name());
    match provider.health_check().await {
        Ok(true) => Check::Ok(format!("{label} accepted the API key")),
        Ok(false) => Check::Warn(format!("{label} answered the key check with an error status")),
        Err(ProviderError::AuthenticationFailed(_)) => {
            Check::Fail(format!("{label} rejected the API key"))
        }
        Err(e) => Check::Warn(format!("{label} unreachable: {e}")),
    }
}

fn check_primary(path: &Path) -> Check {
    if !path.exists() {
        return Check::Warn(format!(
            "Primary document missing at {} — built-in prompt in use",
            path.display()
        ));
    }
    match PrimaryDocument::load(path) {
        Ok(doc) => Check::Ok(format!(
            "Primary document valid (model: {}, web search: {})",
            doc.model_id.as_deref().unwrap_or("none"),
            if doc.web_search.enabled { "on" } else { "off" }
        )),
        Err(e) => Check::Fail(format!("Primary document invalid: {e}")),
    }
}

fn check_secondary(path: &Path) -> Check {
    match load_secondary(path) {
        Ok(Some(_)) => Check::Ok("Secondary document valid".into()),
        Ok(None) => Check::Warn(format!("No secondary document at {}", path.display())),
        Err(e) => Check::Fail(format!("Secondary document invalid: {e}")),
    }
}
