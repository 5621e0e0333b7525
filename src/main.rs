//! Kagami main entry point
//!
//! This is the command-line interface for the Kagami website mirrorer.

use clap::Parser;
use kagami::config::CrawlConfig;
use kagami::crawler::CrawlEngine;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Kagami: an offline website mirrorer
///
/// Kagami crawls a website subtree starting from an entry page, saves pages
/// and assets under the current directory, and rewrites links so the saved
/// copy can be browsed without network access.
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version)]
#[command(about = "Mirror a website subtree for offline browsing", long_about = None)]
struct Cli {
    /// Base URL delimiting the mirrored subtree (host plus optional path
    /// prefix)
    #[arg(value_name = "BASE_URL")]
    base_url: String,

    /// Entry page the crawl starts from
    #[arg(value_name = "ENTRY_URL")]
    entry_url: String,

    /// Number of concurrent workers
    #[arg(long = "n", value_name = "INT", default_value_t = 10)]
    n: usize,

    /// Maximum link depth followed from the entry page
    #[arg(short = 'm', long = "max_depth", value_name = "INT", default_value_t = 2)]
    max_depth: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let mut config = CrawlConfig::new(&cli.base_url, &cli.entry_url)?;
    config.workers = cli.n;
    config.max_depth = cli.max_depth;

    let engine = Arc::new(CrawlEngine::new(config)?);
    let summary = engine.run().await?;

    tracing::info!(
        "mirrored {} pages and {} assets ({} skipped, {} failures)",
        summary.pages_mirrored,
        summary.assets_mirrored,
        summary.skipped,
        summary.failures
    );

    Ok(())
}

/// Sets up the tracing subscriber; RUST_LOG overrides the default filter
fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kagami=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
