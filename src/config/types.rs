use serde::Deserialize;

/// Main configuration structure for Sumi-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub morphology: MorphologyConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link depth followed from a site's root URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Politeness delay before every request (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    #[serde(default = "default_referrer")]
    pub referrer: String,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of fetches in flight across all sites
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Maximum number of site tasks running at once
    #[serde(rename = "max-concurrent-sites", default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: u32,

    /// How long `stop` waits for tasks to wind down before aborting them (seconds)
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Persist a status heartbeat after this many successfully indexed pages
    #[serde(rename = "heartbeat-every", default = "default_heartbeat_every")]
    pub heartbeat_every: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            delay_ms: default_delay_ms(),
            user_agent: default_user_agent(),
            referrer: default_referrer(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_concurrent_sites: default_max_concurrent_sites(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            heartbeat_every: default_heartbeat_every(),
        }
    }
}

/// Search tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Lemmas present on a larger share of a site's pages are ignored
    #[serde(rename = "frequency-threshold", default = "default_frequency_threshold")]
    pub frequency_threshold: f64,

    /// Target snippet window length (characters)
    #[serde(rename = "snippet-length", default = "default_snippet_length")]
    pub snippet_length: usize,

    /// Page size used when the caller does not supply one
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            snippet_length: default_snippet_length(),
            default_limit: default_limit(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Morphology dictionary selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MorphologyConfig {
    /// TSV dictionary (`form<TAB>normal<TAB>POS`); the built-in English
    /// morphology is used when absent
    #[serde(rename = "dictionary-path")]
    pub dictionary_path: Option<String>,
}

/// A site to crawl and index
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Root URL of the site
    pub url: String,

    /// Display name
    pub name: String,
}

fn default_max_depth() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "HeliontSearchBot/1.0".to_string()
}

fn default_referrer() -> String {
    "http://www.google.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> u32 {
    8
}

fn default_max_concurrent_sites() -> u32 {
    4
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_heartbeat_every() -> u32 {
    10
}

fn default_frequency_threshold() -> f64 {
    0.8
}

fn default_snippet_length() -> usize {
    200
}

fn default_limit() -> usize {
    20
}
