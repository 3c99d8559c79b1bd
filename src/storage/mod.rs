//! Storage module for persisting the search index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site status persistence
//! - Page, lemma, and index entry bookkeeping with exact lemma frequencies

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::SumiError;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Storage handle shared by the indexing service and the search engine
///
/// The mutex is the single write path for the index: every frequency
/// update happens while it is held.
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SumiError> {
    SqliteStorage::new(path)
}

/// Opens a storage database wrapped for sharing across tasks
pub fn open_shared_storage(path: &Path) -> Result<SharedStorage, SumiError> {
    Ok(Arc::new(Mutex::new(open_storage(path)?)))
}

/// Represents a site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a fetched page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// Represents a site-scoped lemma
#[derive(Debug, Clone, PartialEq)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    /// Number of distinct pages of the site containing the lemma
    pub frequency: u32,
}

/// Represents one posting: a lemma occurring on a page
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntryRecord {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    /// Occurrence count of the lemma on the page
    pub weight: f64,
}
