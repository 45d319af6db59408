//! The `medtag taxonomy` command for managing the local taxonomy cache.

use anyhow::Context;
use clap::{Args, Subcommand};

use medtag_core::taxonomy::{fetch, Vocabulary};
use medtag_core::Config;

/// Arguments for the `taxonomy` command.
#[derive(Args, Debug)]
pub struct TaxonomyArgs {
    #[command(subcommand)]
    pub command: TaxonomyCommand,
}

/// Subcommands for taxonomy management.
#[derive(Subcommand, Debug)]
pub enum TaxonomyCommand {
    /// Download the IPTC Media Topics JSON to the local cache
    Download {
        /// Re-download even if the file already exists
        #[arg(long)]
        force: bool,
    },

    /// Show concept counts and broad topics of the cached taxonomy
    Info,

    /// Show the local taxonomy cache path
    Path,
}

/// Execute the taxonomy command.
pub async fn execute(args: TaxonomyArgs, config: Config) -> anyhow::Result<()> {
    let path = config.taxonomy_path();

    match args.command {
        TaxonomyCommand::Download { force } => {
            if force && path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove {}", path.display()))?;
            }

            let timeout = std::time::Duration::from_millis(config.limits.download_timeout_ms);
            let downloaded = fetch::download(&config.taxonomy.url, &path, timeout).await?;
            if downloaded {
                println!("Taxonomy downloaded to: {}", path.display());
            } else {
                println!(
                    "Taxonomy already cached at: {}\nUse --force to re-download.",
                    path.display()
                );
            }
        }

        TaxonomyCommand::Info => {
            let vocabulary = Vocabulary::load(&path, &config.taxonomy.lang)?;
            println!("Taxonomy file:  {}", path.display());
            println!("Language:       {}", config.taxonomy.lang);
            println!("Concepts:       {}", vocabulary.len());

            let broad = vocabulary.broad_topics();
            println!("Broad topics:   {}", broad.len());
            for concept in broad {
                println!("  {}  {}", concept.id, concept.label);
            }
        }

        TaxonomyCommand::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}
