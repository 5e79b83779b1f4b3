//! `concierge onboard` — First-time setup.

use std::path::{Path, PathBuf};

use concierge_config::AppConfig;
use concierge_config::knowledge::{SAMPLE_PRIMARY, SAMPLE_SECONDARY};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("🍽️  Concierge — First-Time Setup");
    println!("================================\n");

    for (path, created) in write_defaults(&config_dir)? {
        if created {
            println!("✅ Created {}", path.display());
        } else {
            println!("   Kept existing {}", path.display());
        }
    }

    println!("\n📝 Next steps:");
    println!("   1. Export OPENROUTER_API_KEY (and TAVILY_API_KEY for web search)");
    println!("   2. Edit main-config.json and specific-config.json for your venue");
    println!("   3. Run: concierge doctor, then concierge serve\n");

    Ok(())
}

/// Write the config file and sample documents into `dir`, never overwriting.
///
/// Returns each target path and whether it was created.
fn write_defaults(dir: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    std::fs::create_dir_all(dir)?;

    let default_toml = AppConfig::default_toml();
    let files = [
        ("config.toml", default_toml.as_str()),
        ("main-config.json", SAMPLE_PRIMARY),
        ("specific-config.json", SAMPLE_SECONDARY),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        let created = !path.exists();
        if created {
            std::fs::write(&path, contents)?;
        }
        written.push((path, created));
    }
    Ok(written)
}
