use crate::config::types::{Config, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig};
use crate::url::canonical_site_url;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_search_config(&config.search)?;
    validate_storage_config(&config.storage)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.max_concurrent_sites < 1 || config.max_concurrent_sites > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sites must be between 1 and 100, got {}",
            config.max_concurrent_sites
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.heartbeat_every < 1 {
        return Err(ConfigError::Validation(format!(
            "heartbeat_every must be >= 1, got {}",
            config.heartbeat_every
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates search tuning
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !(config.frequency_threshold > 0.0 && config.frequency_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "frequency_threshold must be in (0, 1], got {}",
            config.frequency_threshold
        )));
    }

    if config.snippet_length < 20 {
        return Err(ConfigError::Validation(format!(
            "snippet_length must be >= 20, got {}",
            config.snippet_length
        )));
    }

    if config.default_limit < 1 {
        return Err(ConfigError::Validation(
            "default_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the site list
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[sites]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' must have a name",
                site.url
            )));
        }

        let canonical = canonical_site_url(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if !seen.insert(canonical.clone()) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is configured more than once",
                canonical
            )));
        }
    }

    Ok(())
}
