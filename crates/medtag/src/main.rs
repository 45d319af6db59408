//! Medtag CLI - Tag text and images with IPTC Media Topics.
//!
//! Medtag combines semantic retrieval over a concept embedding index with an
//! optional LLM classification step to produce controlled-vocabulary tags.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the taxonomy once
//! medtag taxonomy download
//!
//! # Retrieve candidate topics for text
//! medtag tag "Severe flooding hit the coastal region after days of rain..."
//!
//! # Retrieve and let an LLM pick the final tags
//! medtag tag --file article.txt --classify
//!
//! # Tag an image
//! medtag tag --image photo.jpg
//!
//! # View configuration
//! medtag config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Medtag - Tag text and images with IPTC Media Topics.
#[derive(Parser, Debug)]
#[command(name = "medtag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag text or an image with media topics
    Tag(cli::tag::TagArgs),

    /// Manage the local taxonomy cache (download, inspect)
    Taxonomy(cli::taxonomy::TaxonomyArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match medtag_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `medtag config path`."
            );
            medtag_core::Config::default()
        }
    };
    logging::init(&config.logging, cli.verbose, cli.json_logs);

    tracing::debug!("Medtag v{}", medtag_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, config).await,
        Commands::Taxonomy(args) => cli::taxonomy::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
