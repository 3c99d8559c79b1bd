//! Ranked full-text search over the lemma index

use crate::config::SearchConfig;
use crate::crawler::{extract_title, page_text};
use crate::lemma::Lemmatizer;
use crate::search::snippet::build_snippet;
use crate::storage::{
    LemmaRecord, SharedStorage, SiteRecord, SqliteStorage, Storage, StorageError, StorageResult,
};
use crate::url::canonical_site_url;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// User-facing search failures
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("empty query")]
    EmptyQuery,

    #[error("no indexed sites")]
    NoIndexedSites,

    #[error("search failed: {0}")]
    Storage(#[from] StorageError),
}

/// One ranked page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Root URL of the page's site
    pub site: String,
    pub site_name: String,
    /// Page path relative to the site root
    pub uri: String,
    pub title: String,
    /// Text excerpt with query words wrapped in `<b>`
    pub snippet: String,
    /// Relevance normalized to [0, 1] within the page's site
    pub relevance: f64,
}

/// Search outcome as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    /// Number of matches before pagination
    pub total_count: usize,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    fn ok(total_count: usize, results: Vec<SearchResult>) -> Self {
        Self {
            success: true,
            total_count,
            results,
            error: None,
        }
    }

    fn failed(error: &SearchError) -> Self {
        Self {
            success: false,
            total_count: 0,
            results: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// A candidate page with its normalized relevance
#[derive(Debug, Clone)]
struct ScoredPage {
    site_index: usize,
    page_id: i64,
    relevance: f64,
}

/// Answers queries against the index
#[derive(Debug, Clone)]
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(storage: SharedStorage, lemmatizer: Lemmatizer, config: SearchConfig) -> Self {
        Self {
            storage,
            lemmatizer,
            config,
        }
    }

    /// Default page size for callers that do not choose one
    pub fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    /// Searches indexed sites and returns one page of ranked results
    ///
    /// Errors are reported inside the response, never raised.
    ///
    /// # Arguments
    ///
    /// * `query` - Free-text query
    /// * `site` - Restrict the search to the site with this root URL
    /// * `offset` - Number of ranked results to skip
    /// * `limit` - Maximum number of results to return
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> SearchResponse {
        match self.try_search(query, site, offset, limit) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                SearchResponse::failed(&e)
            }
        }
    }

    /// Like [`search`](Self::search) but returns failures as errors
    pub fn try_search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResponse, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let storage = self.storage.lock();

        let sites = searchable_sites(&storage, site)?;
        if sites.is_empty() {
            return Err(SearchError::NoIndexedSites);
        }

        let lemmas = self.lemmatizer.extract_query_lemmas(query);
        if lemmas.is_empty() {
            tracing::debug!("No lemmas in query {:?}", query);
            return Ok(SearchResponse::ok(0, Vec::new()));
        }

        let mut ranked = Vec::new();
        for (site_index, site) in sites.iter().enumerate() {
            ranked.extend(self.rank_site(&storage, site_index, site, &lemmas)?);
        }

        // Stable: equal scores keep site order, then page order
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        let total_count = ranked.len();
        let start = offset.min(total_count);
        let end = start.saturating_add(limit).min(total_count);

        let words = self.highlight_words(query, &lemmas);
        let mut results = Vec::with_capacity(end - start);
        for scored in &ranked[start..end] {
            let site = &sites[scored.site_index];
            let page = storage.get_page_by_id(scored.page_id)?;
            results.push(SearchResult {
                site: site.url.clone(),
                site_name: site.name.clone(),
                uri: page.path,
                title: extract_title(&page.content),
                snippet: build_snippet(
                    &page_text(&page.content),
                    &words,
                    self.config.snippet_length,
                ),
                relevance: scored.relevance,
            });
        }

        tracing::debug!(
            "Query {:?}: {} matches, returning {}",
            query,
            total_count,
            results.len()
        );

        Ok(SearchResponse::ok(total_count, results))
    }

    /// Scores the pages of one site matching every selective query lemma
    fn rank_site(
        &self,
        storage: &SqliteStorage,
        site_index: usize,
        site: &SiteRecord,
        lemmas: &[String],
    ) -> StorageResult<Vec<ScoredPage>> {
        let total_pages = storage.count_pages(site.id)?;
        if total_pages == 0 {
            return Ok(Vec::new());
        }

        let mut selective: Vec<LemmaRecord> = storage
            .find_lemmas(site.id, lemmas)?
            .into_iter()
            .filter(|lemma| {
                f64::from(lemma.frequency) / total_pages as f64 <= self.config.frequency_threshold
            })
            .collect();
        if selective.is_empty() {
            return Ok(Vec::new());
        }

        // Rarest first keeps the running intersection small
        selective.sort_by_key(|lemma| lemma.frequency);

        let mut candidates: Option<HashSet<i64>> = None;
        for lemma in &selective {
            let postings: HashSet<i64> = storage.page_ids_for_lemma(lemma.id)?.into_iter().collect();
            let next = match candidates {
                None => postings,
                Some(current) => current.intersection(&postings).copied().collect(),
            };
            if next.is_empty() {
                return Ok(Vec::new());
            }
            candidates = Some(next);
        }

        let mut page_ids: Vec<i64> = candidates.unwrap_or_default().into_iter().collect();
        page_ids.sort_unstable();

        let lemma_ids: Vec<i64> = selective.iter().map(|lemma| lemma.id).collect();
        let mut scored = Vec::with_capacity(page_ids.len());
        let mut max_relevance = 0.0f64;
        for page_id in page_ids {
            let relevance = storage.relevance_for_page(page_id, &lemma_ids)?;
            max_relevance = max_relevance.max(relevance);
            scored.push(ScoredPage {
                site_index,
                page_id,
                relevance,
            });
        }

        if max_relevance > 0.0 {
            for page in &mut scored {
                page.relevance /= max_relevance;
            }
        }

        Ok(scored)
    }

    /// Query words worth highlighting: content words as typed, then their lemmas
    fn highlight_words(&self, query: &str, lemmas: &[String]) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for word in self.lemmatizer.words(query) {
            if !words.contains(&word) && !self.lemmatizer.extract_query_lemmas(&word).is_empty() {
                words.push(word);
            }
        }
        for lemma in lemmas {
            if !words.contains(lemma) {
                words.push(lemma.clone());
            }
        }
        words
    }
}

/// Sites eligible for a search: the filtered site or every `Indexed` site
fn searchable_sites(storage: &SqliteStorage, filter: Option<&str>) -> StorageResult<Vec<SiteRecord>> {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => {
            let Ok(url) = canonical_site_url(filter) else {
                return Ok(Vec::new());
            };
            Ok(storage
                .get_site_by_url(&url)?
                .filter(|site| site.status.is_searchable())
                .into_iter()
                .collect())
        }
        None => Ok(storage
            .list_sites()?
            .into_iter()
            .filter(|site| site.status.is_searchable())
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::EnglishMorphology;
    use crate::state::SiteStatus;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn engine() -> (SearchEngine, SharedStorage) {
        let storage: SharedStorage =
            Arc::new(Mutex::new(SqliteStorage::open_in_memory().unwrap()));
        let lemmatizer = Lemmatizer::new(Arc::new(EnglishMorphology::new()));
        let engine = SearchEngine::new(storage.clone(), lemmatizer, SearchConfig::default());
        (engine, storage)
    }

    fn add_site(storage: &SharedStorage, url: &str, status: SiteStatus) -> i64 {
        storage.lock().insert_site(url, "Site", status).unwrap()
    }

    /// Stores a page whose text is `text`, indexed with the given lemma counts
    fn add_page(storage: &SharedStorage, site_id: i64, path: &str, text: &str, lemmas: &[(&str, u32)]) {
        let html = format!("<html><head><title>{}</title></head><body><p>{}</p></body></html>", path, text);
        let lemmas: HashMap<String, u32> = lemmas.iter().map(|(l, c)| (l.to_string(), *c)).collect();
        storage
            .lock()
            .store_page(site_id, path, 200, &html, &lemmas)
            .unwrap();
    }

    #[test]
    fn test_empty_query() {
        let (engine, _) = engine();
        let response = engine.search("   ", None, 0, 10);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("empty query"));
    }

    #[test]
    fn test_no_indexed_sites() {
        let (engine, storage) = engine();
        add_site(&storage, "https://failed.com", SiteStatus::Failed);

        let response = engine.search("fox", None, 0, 10);
        assert_eq!(response.error.as_deref(), Some("no indexed sites"));

        let response = engine.search("fox", Some("https://failed.com"), 0, 10);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("no indexed sites"));
    }

    #[test]
    fn test_query_without_lemmas_is_empty_success() {
        let (engine, storage) = engine();
        let site = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        add_page(&storage, site, "/", "fox", &[("fox", 1)]);

        let response = engine.search("the and of", None, 0, 10);
        assert!(response.success);
        assert_eq!(response.total_count, 0);
    }

    #[test]
    fn test_intersection_and_normalization() {
        let (engine, storage) = engine();
        let site = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        add_page(&storage, site, "/both", "brown fox brown", &[("brown", 2), ("fox", 1)]);
        add_page(&storage, site, "/both-more", "fox fox brown fox", &[("brown", 1), ("fox", 3)]);
        add_page(&storage, site, "/fox", "fox", &[("fox", 1)]);
        add_page(&storage, site, "/other", "cat", &[("cat", 1)]);
        add_page(&storage, site, "/other2", "dog", &[("dog", 1)]);

        let response = engine.search("brown foxes", None, 0, 10);
        assert!(response.success);
        assert_eq!(response.total_count, 2);
        assert_eq!(response.results[0].uri, "/both-more");
        assert_eq!(response.results[0].relevance, 1.0);
        assert_eq!(response.results[1].uri, "/both");
        assert_eq!(response.results[1].relevance, 0.75);
        assert_eq!(response.results[0].title, "/both-more");
        assert!(response.results[0].snippet.contains("<b>fox</b>"));
    }

    #[test]
    fn test_missing_query_lemma_is_ignored() {
        let (engine, storage) = engine();
        let site = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        add_page(&storage, site, "/", "fox", &[("fox", 1)]);
        add_page(&storage, site, "/cat", "cat", &[("cat", 1)]);

        let response = engine.search("fox unicorn", None, 0, 10);
        assert_eq!(response.total_count, 1);
        assert_eq!(response.results[0].uri, "/");
    }

    #[test]
    fn test_common_lemma_threshold() {
        let (engine, storage) = engine();
        let site = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        for i in 0..10 {
            let mut lemmas = vec![("filler", 1)];
            if i < 9 {
                lemmas.push(("common", 1));
            }
            if i < 8 {
                lemmas.push(("frequent", 1));
            }
            add_page(&storage, site, &format!("/p{}", i), "text", &lemmas);
        }

        // 9 of 10 pages: excluded, so nothing is left to rank
        let response = engine.search("common", None, 0, 20);
        assert!(response.success);
        assert_eq!(response.total_count, 0);

        // 8 of 10 pages: included
        let response = engine.search("frequent", None, 0, 20);
        assert_eq!(response.total_count, 8);
    }

    #[test]
    fn test_pagination() {
        let (engine, storage) = engine();
        let site = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        for i in 0..10u32 {
            add_page(&storage, site, &format!("/p{}", i), "fox", &[("fox", 10 - i)]);
        }
        for i in 0..3 {
            add_page(&storage, site, &format!("/x{}", i), "cat", &[("cat", 1)]);
        }

        let response = engine.search("fox", None, 5, 3);
        assert_eq!(response.total_count, 10);
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].uri, "/p5");
        assert_eq!(response.results[2].uri, "/p7");

        let response = engine.search("fox", None, 20, 3);
        assert!(response.success);
        assert_eq!(response.total_count, 10);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_site_filter_and_cross_site_merge() {
        let (engine, storage) = engine();
        let a = add_site(&storage, "https://a.com", SiteStatus::Indexed);
        let b = add_site(&storage, "https://b.com", SiteStatus::Indexed);
        for site in [a, b] {
            add_page(&storage, site, "/fox", "fox", &[("fox", 1)]);
            add_page(&storage, site, "/cat", "cat", &[("cat", 1)]);
        }

        let response = engine.search("fox", None, 0, 10);
        assert_eq!(response.total_count, 2);
        assert!(response.results.iter().all(|r| r.relevance == 1.0));

        let response = engine.search("fox", Some("https://b.com/"), 0, 10);
        assert_eq!(response.total_count, 1);
        assert_eq!(response.results[0].site, "https://b.com");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = SearchResponse::ok(
            1,
            vec![SearchResult {
                site: "https://a.com".to_string(),
                site_name: "A".to_string(),
                uri: "/".to_string(),
                title: "Home".to_string(),
                snippet: "<b>fox</b>".to_string(),
                relevance: 1.0,
            }],
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["results"][0]["siteName"], "A");
        assert!(json.get("error").is_none());
    }
}
