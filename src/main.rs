//! Sumi-Search main entry point
//!
//! This is the command-line interface for the Sumi-Search site search engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_search::config::{load_config_with_hash, Config};
use sumi_search::indexing::IndexingService;
use sumi_search::lemma::load_lemmatizer;
use sumi_search::output::{collect_statistics, print_statistics};
use sumi_search::search::{SearchEngine, SearchResponse};
use sumi_search::storage::{open_shared_storage, SharedStorage};
use tracing_subscriber::EnvFilter;

/// Sumi-Search: a lemma-indexed site search engine
///
/// Sumi-Search crawls the configured websites, indexes the lemmas of
/// every page it finds, and answers ranked full-text queries.
#[derive(Parser, Debug)]
#[command(name = "sumi-search")]
#[command(version = "1.0.0")]
#[command(about = "A lemma-indexed site search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-index every configured site and wait for the run to finish
    Index,

    /// Re-index a single page of a configured site
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Search the indexed sites
    Search {
        /// Free-text query
        query: String,

        /// Restrict results to the site with this root URL
        #[arg(long, value_name = "URL")]
        site: Option<String>,

        /// Number of ranked results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats {
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let config = Arc::new(config);
    let storage = open_shared_storage(Path::new(&config.storage.database_path))?;

    match cli.command {
        Command::Index => handle_index(config, storage).await?,
        Command::IndexPage { url } => handle_index_page(config, storage, &url).await?,
        Command::Search {
            query,
            site,
            offset,
            limit,
            json,
        } => handle_search(&config, storage, &query, site.as_deref(), offset, limit, json)?,
        Command::Stats { json } => handle_stats(&config, &storage, json)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_search=info,warn"),
            1 => EnvFilter::new("sumi_search=debug,info"),
            2 => EnvFilter::new("sumi_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn indexing_service(config: Arc<Config>, storage: SharedStorage) -> anyhow::Result<IndexingService> {
    let lemmatizer = load_lemmatizer(&config.morphology)?;
    Ok(IndexingService::new(config, storage, lemmatizer)?)
}

/// Handles `index`: runs a full indexing pass, stopping it on Ctrl-C
async fn handle_index(config: Arc<Config>, storage: SharedStorage) -> anyhow::Result<()> {
    tracing::info!("Sites to index: {}", config.sites.len());
    let service = indexing_service(config, storage)?;

    if !service.start_full_indexing() {
        anyhow::bail!("Indexing is already running");
    }

    tokio::select! {
        _ = service.wait_until_idle() => {
            tracing::info!("Indexing completed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::warn!("Interrupted, stopping indexing");
            service.stop_indexing().await;
        }
    }

    Ok(())
}

/// Handles `index-page`: re-indexes one page
async fn handle_index_page(
    config: Arc<Config>,
    storage: SharedStorage,
    url: &str,
) -> anyhow::Result<()> {
    let service = indexing_service(config, storage)?;

    if !service.index_single_page(url).await {
        anyhow::bail!("Page {} is outside the configured sites or could not be stored", url);
    }

    println!("✓ Indexed {}", url);
    Ok(())
}

/// Handles `search`: prints one page of ranked results
fn handle_search(
    config: &Config,
    storage: SharedStorage,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let lemmatizer = load_lemmatizer(&config.morphology)?;
    let engine = SearchEngine::new(storage, lemmatizer, config.search.clone());
    let limit = limit.unwrap_or_else(|| engine.default_limit());

    let response = engine.search(query, site, offset, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_search_response(&response);
    }

    if !response.success {
        anyhow::bail!("Search failed");
    }
    Ok(())
}

fn print_search_response(response: &SearchResponse) {
    if let Some(error) = &response.error {
        println!("Error: {}", error);
        return;
    }

    println!("=== {} results ===\n", response.total_count);
    for result in &response.results {
        println!("[{:.3}] {}{}", result.relevance, result.site, result.uri);
        if !result.title.is_empty() {
            println!("  {}", result.title);
        }
        println!("  {}", result.snippet);
        println!();
    }
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config, storage: &SharedStorage, json: bool) -> anyhow::Result<()> {
    // A separate process cannot observe another's run, so the flag is false
    let stats = collect_statistics(config, &*storage.lock(), false)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Database: {}\n", config.storage.database_path);
        print_statistics(&stats);
    }

    Ok(())
}
