//! Integration tests for Sumi-Search
//!
//! These tests use wiremock to serve small websites and drive the full
//! crawl, index and search cycle end-to-end against an on-disk database.

mod indexing_tests;
mod search_tests;

use std::path::Path;
use std::sync::Arc;
use sumi_search::config::{
    Config, CrawlerConfig, MorphologyConfig, SearchConfig, SiteEntry, StorageConfig,
};
use sumi_search::indexing::IndexingService;
use sumi_search::lemma::load_lemmatizer;
use sumi_search::search::SearchEngine;
use sumi_search::storage::{open_shared_storage, SharedStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration indexing `site_url` into `db_path`
pub fn create_test_config(site_url: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 2,
            delay_ms: 0,
            timeout_secs: 5,
            shutdown_grace_secs: 1,
            ..CrawlerConfig::default()
        },
        search: SearchConfig::default(),
        storage: StorageConfig {
            database_path: db_path.display().to_string(),
        },
        morphology: MorphologyConfig::default(),
        sites: vec![SiteEntry {
            url: site_url.to_string(),
            name: "Test Garden".to_string(),
        }],
    }
}

/// Everything one test needs, wired the way the binary wires it
pub struct TestApp {
    pub config: Arc<Config>,
    pub storage: SharedStorage,
    pub service: IndexingService,
    pub engine: SearchEngine,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let storage = open_shared_storage(Path::new(&config.storage.database_path))
            .expect("Failed to open database");
        let lemmatizer = load_lemmatizer(&config.morphology).expect("Failed to load morphology");
        let service = IndexingService::new(config.clone(), storage.clone(), lemmatizer.clone())
            .expect("Failed to create indexing service");
        let engine = SearchEngine::new(storage.clone(), lemmatizer, config.search.clone());

        Self {
            config,
            storage,
            service,
            engine,
        }
    }

    /// Runs a full indexing pass to completion
    pub async fn index_all(&self) {
        assert!(self.service.start_full_indexing(), "Run already active");
        self.service.wait_until_idle().await;
    }
}

/// Mounts an HTML page at `page_path`
pub async fn mount_html(server: &MockServer, page_path: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(format!(
                    "<html><head><title>{}</title></head><body>{}</body></html>",
                    title, body
                ), "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a three-page garden site
///
/// `fox` appears on `/fox` (twice) and `/birds` (once); `watch` only on `/birds`.
pub async fn mount_garden(server: &MockServer) {
    mount_html(
        server,
        "/",
        "Home",
        r#"<p>Welcome to the garden</p>
        <a href="/fox">Wild animals</a>
        <a href="/birds">Songbirds</a>"#,
    )
    .await;
    mount_html(
        server,
        "/fox",
        "Foxes",
        "<p>The quick brown fox jumps near the fox den</p>",
    )
    .await;
    mount_html(server, "/birds", "Birds", "<p>Birds watch the fox</p>").await;
}

/// Checks that every lemma's frequency equals the size of its posting list
pub fn assert_frequencies_consistent(storage: &dyn Storage, site_id: i64) {
    let lemmas = storage.lemmas_by_site(site_id).expect("Failed to list lemmas");
    assert!(!lemmas.is_empty(), "Site {} has no lemmas", site_id);

    for lemma in lemmas {
        let postings = storage
            .page_ids_for_lemma(lemma.id)
            .expect("Failed to load postings");
        assert_eq!(
            lemma.frequency as usize,
            postings.len(),
            "Frequency of {:?} does not match its postings",
            lemma.lemma
        );
    }
}
