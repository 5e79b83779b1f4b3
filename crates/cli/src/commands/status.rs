//! `concierge status` — Show the operational status right now.

use concierge_config::AppConfig;
use concierge_pipeline::temporal;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    let context = temporal::compute(temporal::now(config.temporal.utc_offset_minutes));

    println!("🍽️  Concierge Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!(
        "  Provider:     {} ({})",
        concierge_providers::display_name(&config.provider.name),
        config.provider.base_url
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Clock:        {}",
        match config.temporal.utc_offset_minutes {
            Some(minutes) => format!("UTC{:+}min", minutes),
            None => "Italian time (CET/CEST)".into(),
        }
    );
    println!(
        "  Temporal:     {}",
        if config.temporal.enabled { "injected" } else { "disabled" }
    );
    println!();
    println!("{context}");

    Ok(())
}
