//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{IndexEntryRecord, LemmaRecord, PageRecord, SiteRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every multi-row mutation (`store_page`, `remove_page`, `clear_site`,
/// `delete_site`) must be atomic: after it returns, for every lemma of the
/// touched site, `frequency` equals the number of pages holding an index
/// entry for it.
pub trait Storage {
    // ===== Site Management =====

    /// Inserts a new site row and returns its ID
    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets the oldest site row stored under `url`
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Gets every site row stored under `url`, oldest first
    fn find_sites_by_url(&self, url: &str) -> StorageResult<Vec<SiteRecord>>;

    /// Gets all site rows
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Writes a status (and error message) and refreshes the status time
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Refreshes the status time without changing the status
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Moves every `Indexing` site to `Failed` with `message`
    ///
    /// Returns the number of sites changed.
    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<u64>;

    /// Deletes a site together with its pages, lemmas, and index entries
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Page Management =====

    /// Gets a page by site and path
    fn get_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets a page by ID
    fn get_page_by_id(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Counts pages of a site
    fn count_pages(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts pages across all sites
    fn count_all_pages(&self) -> StorageResult<u64>;

    /// Persists one fetch result for `(site_id, path)` with its lemma counts
    ///
    /// Any page already stored at the path is unindexed and replaced first.
    /// Each lemma in `lemmas` gains one page of frequency and one index
    /// entry weighted by its count. Returns the new page ID.
    fn store_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
        lemmas: &HashMap<String, u32>,
    ) -> StorageResult<i64>;

    /// Unindexes and deletes a page
    ///
    /// Index entries are removed, each referenced lemma loses one page of
    /// frequency, and lemmas reaching zero are deleted.
    fn remove_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Deletes every page, lemma, and index entry of a site, keeping the site row
    fn clear_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Lemma Management =====

    /// Gets a lemma by site and normal form
    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Gets the lemma rows of a site matching any of `lemmas`
    fn find_lemmas(&self, site_id: i64, lemmas: &[String]) -> StorageResult<Vec<LemmaRecord>>;

    /// Gets all lemmas of a site
    fn lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>>;

    /// Counts distinct lemmas of a site
    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts lemmas across all sites
    fn count_all_lemmas(&self) -> StorageResult<u64>;

    /// Deletes a lemma and every index entry referencing it
    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    // ===== Index Entries =====

    /// Gets all index entries of a page
    fn entries_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexEntryRecord>>;

    /// Gets the posting list (page IDs) of a lemma
    fn page_ids_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>>;

    /// Sums the weights of a page's entries restricted to `lemma_ids`
    fn relevance_for_page(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64>;
}
