//! Search module for answering ranked queries
//!
//! This module handles:
//! - Query lemmatization and corpus-relative stopword filtering
//! - Posting-list intersection starting from the rarest lemma
//! - Relevance scoring, cross-site merging and pagination
//! - Snippet generation with highlighted query words

mod engine;
mod snippet;

pub use engine::{SearchEngine, SearchError, SearchResponse, SearchResult};
pub use snippet::build_snippet;
