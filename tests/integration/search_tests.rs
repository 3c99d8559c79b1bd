//! Ranked search over a freshly indexed mock website

use crate::{create_test_config, mount_garden, mount_html, TestApp};
use sumi_search::output::collect_statistics;
use sumi_search::state::SiteStatus;
use sumi_search::storage::Storage;
use sumi_search::url::canonical_site_url;
use tempfile::tempdir;
use wiremock::MockServer;

#[tokio::test]
async fn test_search_after_full_run() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));
    app.index_all().await;

    let response = app.engine.search("fox", None, 0, 10);
    assert!(response.success, "unexpected error: {:?}", response.error);
    assert_eq!(response.total_count, 2);

    let first = &response.results[0];
    assert_eq!(first.uri, "/fox");
    assert_eq!(first.title, "Foxes");
    assert_eq!(first.site_name, "Test Garden");
    assert_eq!(first.relevance, 1.0);
    assert!(first.snippet.contains("<b>fox</b>"));

    let second = &response.results[1];
    assert_eq!(second.uri, "/birds");
    assert_eq!(second.relevance, 0.5);
}

#[tokio::test]
async fn test_search_requires_every_lemma() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));
    app.index_all().await;

    let response = app.engine.search("quick foxes", None, 0, 10);
    assert!(response.success);
    assert_eq!(response.total_count, 1);
    assert_eq!(response.results[0].uri, "/fox");
    assert_eq!(response.results[0].relevance, 1.0);
}

#[tokio::test]
async fn test_single_page_index_is_searchable() {
    let server = MockServer::start().await;
    mount_html(&server, "/news", "News", "<p>harvest festival tonight</p>").await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));

    assert!(
        app.service
            .index_single_page(&format!("{}/news", server.uri()))
            .await
    );

    // A lone page holds every lemma, so raise the threshold to keep them
    let engine = sumi_search::search::SearchEngine::new(
        app.storage.clone(),
        sumi_search::lemma::load_lemmatizer(&app.config.morphology).unwrap(),
        sumi_search::config::SearchConfig {
            frequency_threshold: 1.0,
            ..app.config.search.clone()
        },
    );

    let response = engine.search("festival", None, 0, 10);
    assert!(response.success);
    assert_eq!(response.total_count, 1);
    assert_eq!(response.results[0].uri, "/news");
    assert_eq!(response.results[0].relevance, 1.0);
}

#[tokio::test]
async fn test_search_failed_site_reports_error() {
    let server = MockServer::start().await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));

    let site_url = canonical_site_url(&server.uri()).unwrap();
    app.storage
        .lock()
        .insert_site(&site_url, "Test Garden", SiteStatus::Failed)
        .unwrap();

    let response = app.engine.search("fox", Some(&site_url), 0, 10);
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("no indexed sites"));
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_statistics_after_full_run() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));
    app.index_all().await;

    let stats = collect_statistics(&app.config, &*app.storage.lock(), false).unwrap();
    assert_eq!(stats.total.sites, 1);
    assert_eq!(stats.total.pages, 3);
    assert_eq!(stats.detailed[0].status, SiteStatus::Indexed);
    assert_eq!(stats.detailed[0].pages, 3);
}
