//! Single-page indexing
//!
//! Fetches one URL and makes the stored page, lemma and index entry rows of
//! its site consistent with that fetch.

use crate::crawler::{page_text, FetchError, FetchScheduler};
use crate::lemma::Lemmatizer;
use crate::storage::{SharedStorage, SiteRecord, Storage, StorageError};
use crate::url::{normalize_url, site_relative_path_or_root};
use crate::UrlError;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while indexing a page or a site
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IndexError {
    /// Returns true if the error only affects the page being indexed
    ///
    /// Fetch and URL errors skip the page. Storage errors are unexpected and
    /// fail the whole site.
    pub fn is_page_local(&self) -> bool {
        matches!(self, IndexError::Fetch(_) | IndexError::Url(_))
    }

    /// Short name of the error class, used in site error messages
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::Fetch(_) => "FetchError",
            IndexError::Url(_) => "UrlError",
            IndexError::Storage(_) => "StorageError",
        }
    }
}

/// Outcome of indexing one page
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPage {
    pub page_id: i64,
    /// Path relative to the site root
    pub path: String,
    /// HTTP status the page was stored with
    pub status: u16,
    /// Number of distinct lemmas indexed (0 for non-200 pages)
    pub lemma_count: usize,
}

/// Fetches pages and writes them into the index
#[derive(Debug, Clone)]
pub struct Indexer {
    scheduler: FetchScheduler,
    lemmatizer: Lemmatizer,
    storage: SharedStorage,
}

impl Indexer {
    pub fn new(scheduler: FetchScheduler, lemmatizer: Lemmatizer, storage: SharedStorage) -> Self {
        Self {
            scheduler,
            lemmatizer,
            storage,
        }
    }

    /// Fetches `url` and stores it as a page of `site`
    ///
    /// Any page already stored at the same path is unindexed and replaced.
    /// Only pages answering 200 with an HTML body get lemmas and index
    /// entries; other statuses are stored with their content alone.
    ///
    /// # Errors
    ///
    /// * `IndexError::Url` - `url` cannot be normalized
    /// * `IndexError::Fetch` - the request failed at the network level
    /// * `IndexError::Storage` - the write failed; nothing was changed
    pub async fn index_page(&self, url: &str, site: &SiteRecord) -> Result<IndexedPage, IndexError> {
        let normalized = normalize_url(url)?;
        let path = site_relative_path_or_root(normalized.as_str(), &site.url);

        let page = self.scheduler.fetch(normalized.as_str()).await?;

        let lemmas = if page.status == 200 && page.is_html() {
            self.lemmatizer.extract_lemmas(&page_text(&page.body))
        } else {
            tracing::warn!("Storing {} without lemmas (status {})", normalized, page.status);
            HashMap::new()
        };

        let page_id = self
            .storage
            .lock()
            .store_page(site.id, &path, page.status, &page.body, &lemmas)?;

        tracing::debug!(
            "Indexed {} as {}{} ({} lemmas)",
            normalized,
            site.url,
            path,
            lemmas.len()
        );

        Ok(IndexedPage {
            page_id,
            path,
            status: page.status,
            lemma_count: lemmas.len(),
        })
    }

    /// Removes the page stored at `path`, if any
    ///
    /// Returns true if a page was removed.
    pub fn remove_page(&self, site_id: i64, path: &str) -> Result<bool, IndexError> {
        let mut storage = self.storage.lock();
        match storage.get_page(site_id, path)? {
            Some(page) => {
                storage.remove_page(page.id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
