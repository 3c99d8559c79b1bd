//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! per-site indexing statistics from the storage layer.

use crate::config::Config;
use crate::state::SiteStatus;
use crate::storage::Storage;
use crate::url::canonical_site_url;
use crate::SumiError;
use chrono::DateTime;
use serde::Serialize;

/// Error reported for a configured site that has no site row yet
pub const NOT_INDEXED: &str = "Site is not indexed";

/// Index-wide totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalStatistics {
    /// Number of configured sites
    pub sites: usize,
    pub pages: u64,
    pub lemmas: u64,
    /// Whether a full indexing run is in progress
    pub indexing: bool,
}

/// Statistics of one configured site
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// Last status change, in seconds since the Unix epoch
    pub status_time: i64,
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// Index statistics summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Collects statistics for every configured site
///
/// # Arguments
///
/// * `config` - Configuration listing the sites
/// * `storage` - The storage backend to query
/// * `indexing` - Whether a full run is currently active
///
/// # Returns
///
/// * `Ok(Statistics)` - Successfully collected statistics
/// * `Err(SumiError)` - Failed to query storage
pub fn collect_statistics(
    config: &Config,
    storage: &dyn Storage,
    indexing: bool,
) -> Result<Statistics, SumiError> {
    let total = TotalStatistics {
        sites: config.sites.len(),
        pages: storage.count_all_pages()?,
        lemmas: storage.count_all_lemmas()?,
        indexing,
    };

    let mut detailed = Vec::with_capacity(config.sites.len());
    for entry in &config.sites {
        let url = canonical_site_url(&entry.url)?;

        let item = match storage.get_site_by_url(&url)? {
            Some(site) => SiteStatistics {
                url: site.url.clone(),
                name: entry.name.clone(),
                status: site.status,
                status_time: unix_seconds(&site.status_time),
                error: site.last_error.clone(),
                pages: storage.count_pages(site.id)?,
                lemmas: storage.count_lemmas(site.id)?,
            },
            None => SiteStatistics {
                url,
                name: entry.name.clone(),
                status: SiteStatus::Failed,
                status_time: 0,
                error: Some(NOT_INDEXED.to_string()),
                pages: 0,
                lemmas: 0,
            },
        };
        detailed.push(item);
    }

    Ok(Statistics { total, detailed })
}

fn unix_seconds(timestamp: &str) -> i64 {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|time| time.timestamp())
        .unwrap_or(0)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &Statistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.indexing { "running" } else { "idle" }
    );
    println!();

    println!("Sites:");
    for site in &stats.detailed {
        println!("  {} ({})", site.name, site.url);
        println!("    Status: {}", site.status);
        if let Some(time) = DateTime::from_timestamp(site.status_time, 0) {
            if site.status_time > 0 {
                println!("    Since: {}", time.to_rfc3339());
            }
        }
        println!("    Pages: {}, lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.error {
            println!("    Error: {}", error);
        }
    }
}
