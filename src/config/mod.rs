//! Configuration module for Sumi-Search
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_search::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, MorphologyConfig, SearchConfig, SiteEntry, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

use crate::url::site_relative_path;

impl Config {
    /// Finds the configured site whose URL prefixes `url`
    pub fn site_for_url(&self, url: &str) -> Option<&SiteEntry> {
        self.sites
            .iter()
            .find(|site| site_relative_path(url, &site.url).is_ok())
    }
}
