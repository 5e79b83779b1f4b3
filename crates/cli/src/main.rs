//! Concierge CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP API server
//! - `render`   — Print the system prompts rendered from the knowledge documents
//! - `classify` — Explain the web-search decision for a message
//! - `status`   — Show the operational status right now
//! - `doctor`   — Diagnose configuration, credentials, and documents
//! - `onboard`  — Write the default config and sample documents

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "concierge",
    about = "Concierge — knowledge-grounded chat assistant with live web search",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the rendered system prompts
    Render {
        /// Primary document (defaults to the configured path)
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Secondary document (defaults to the configured path)
        #[arg(long)]
        secondary: Option<PathBuf>,
    },

    /// Explain whether a message would trigger a web search
    Classify {
        /// The user message to classify
        message: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current operational status
    Status,

    /// Diagnose configuration and documents
    Doctor,

    /// Write default configuration and sample documents
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Render { primary, secondary } => commands::render::run(primary, secondary).await?,
        Commands::Classify { message, json } => commands::classify::run(&message, json).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
