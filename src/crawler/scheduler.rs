//! Scheduler for bounding concurrent fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore shared by every site task
//! - Handing each permitted request to the rate-limited fetcher

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared gate in front of the [`Fetcher`]
///
/// At most `max_concurrent_fetches` requests are in flight across all
/// sites. The politeness delay is spent while holding the permit, so the
/// limit also caps the aggregate request rate.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    fetcher: Fetcher,
    global_semaphore: Arc<Semaphore>,
}

impl FetchScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_fetcher(
            Fetcher::new(config)?,
            config.max_concurrent_fetches as usize,
        ))
    }

    /// Creates a scheduler around an existing fetcher
    pub fn with_fetcher(fetcher: Fetcher, max_concurrent_fetches: usize) -> Self {
        Self {
            fetcher,
            global_semaphore: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
        }
    }

    /// Waits for a permit, then fetches `url`
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let _permit = self
            .global_semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::SchedulerClosed)?;

        tracing::trace!(
            "Fetching {} ({} permits left)",
            url,
            self.global_semaphore.available_permits()
        );

        self.fetcher.fetch(url).await
    }

    /// Returns the number of fetches that could start right now
    pub fn available_permits(&self) -> usize {
        self.global_semaphore.available_permits()
    }
}
