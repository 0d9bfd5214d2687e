mod crawl;
mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pharmacrawl_core::SiteVariant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pharmacrawl")]
#[command(about = "Pharmacy catalog crawler command line interface")]
struct Cli {
    /// Catalog file; defaults to `PHARMACRAWL_CATALOG_PATH`.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full crawl and write the artifacts. Ctrl-C cancels and keeps
    /// what was collected so far.
    Crawl {
        /// Artifact directory; defaults to `PHARMACRAWL_DATA_DIR`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the static work list resolved from the catalog.
    Targets {
        /// Emit JSON instead of one line per target.
        #[arg(long)]
        json: bool,
    },
    /// Run an extractor over a saved HTML document.
    Extract {
        /// Saved document to parse.
        file: PathBuf,
        /// Markup generation of the document.
        #[arg(long, default_value = "current")]
        site: SiteVariant,
        /// Treat the document as a page of this category listing.
        #[arg(long)]
        listing: Option<String>,
        /// Page number when `--listing` is given.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Product identifier when the document is a lookup page.
        #[arg(long, default_value_t = 0)]
        id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut config = pharmacrawl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(catalog) = cli.catalog {
        config.catalog_path = catalog;
    }

    match cli.command {
        Commands::Crawl { output } => {
            if let Some(output) = output {
                config.data_dir = output;
            }
            crawl::run_crawl(&config).await
        }
        Commands::Targets { json } => inspect::print_targets(&config, json),
        Commands::Extract {
            file,
            site,
            listing,
            page,
            id,
        } => inspect::extract_file(&file, site, listing, page, id),
    }
}

#[cfg(test)]
mod tests;
