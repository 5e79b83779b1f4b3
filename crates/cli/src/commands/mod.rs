pub mod classify;
pub mod doctor;
pub mod onboard;
pub mod render;
pub mod serve;
pub mod status;

use concierge_config::AppConfig;

/// Load the app config or fail with a readable message.
pub fn load_config() -> Result<AppConfig, String> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))
}
