//! Indexing module for building the per-site inverted index
//!
//! This module handles:
//! - Fetching a page and persisting it with its lemma counts
//! - Full runs across all configured sites (start, stop, completion)
//! - Re-indexing a single page on demand

mod indexer;
mod service;

pub use indexer::{IndexError, IndexedPage, Indexer};
pub use service::{IndexingService, STOPPED_BY_USER};
