//! `concierge render` — Print the system prompts the pipeline would send.

use std::path::PathBuf;

use concierge_config::KnowledgePaths;
use concierge_pipeline::{KnowledgeBase, RenderedPrompt};

pub async fn run(
    primary: Option<PathBuf>,
    secondary: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let paths = override_paths(config.knowledge, primary, secondary);

    let base = KnowledgeBase::load(&paths);
    print!("{}", report(base.prompt()));

    Ok(())
}

fn override_paths(
    mut paths: KnowledgePaths,
    primary: Option<PathBuf>,
    secondary: Option<PathBuf>,
) -> KnowledgePaths {
    if let Some(primary) = primary {
        paths.primary_path = primary;
    }
    if secondary.is_some() {
        paths.secondary_path = secondary;
    }
    paths
}

fn report(prompt: &RenderedPrompt) -> String {
    let mut out = format!("── Primary ──\n\n{}\n", prompt.primary);
    match prompt.secondary.as_deref() {
        Some(text) => out.push_str(&format!("\n── Secondary ──\n\n{text}\n")),
        None => out.push_str("\n── Secondary ── (none)\n"),
    }
    out
}
