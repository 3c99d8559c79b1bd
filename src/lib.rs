//! Sumi-Search: a lemma-indexed site search engine
//!
//! This crate crawls a configured set of websites, builds a per-site inverted
//! index over lemmatized page text, and answers ranked full-text queries
//! against that index.

pub mod config;
pub mod crawler;
pub mod indexing;
pub mod lemma;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Search operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Indexing error: {0}")]
    Index(#[from] indexing::IndexError),

    #[error("Search error: {0}")]
    Search(#[from] search::SearchError),

    #[error("Morphology error: {0}")]
    Morphology(#[from] lemma::MorphologyError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("URL {url} is outside site {site}")]
    OutsideSite { url: String, site: String },
}

/// Result type alias for Sumi-Search operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use indexing::IndexingService;
pub use search::{SearchEngine, SearchResponse};
pub use state::SiteStatus;
pub use url::{normalize_url, site_relative_path};
