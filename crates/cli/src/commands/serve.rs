//! `concierge serve` — Start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🍽️  Concierge Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Chat:      POST /api/chat, POST /api/chat-with-search");
    if !config.has_api_key() {
        println!("   ⚠️  No completion API key — chat requests will fail");
    }

    concierge_gateway::start(config).await?;

    Ok(())
}
