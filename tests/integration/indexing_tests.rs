//! Full-run and single-page indexing against a mock website

use crate::{assert_frequencies_consistent, create_test_config, mount_garden, mount_html, TestApp};
use std::io::Write;
use sumi_search::config::load_config;
use sumi_search::state::SiteStatus;
use sumi_search::storage::Storage;
use tempfile::{tempdir, NamedTempFile};
use wiremock::MockServer;

#[tokio::test]
async fn test_full_run_indexes_every_page() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));

    app.index_all().await;
    assert!(!app.service.is_indexing_active());

    let storage = app.storage.lock();
    let sites = storage.list_sites().expect("Failed to list sites");
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].status, SiteStatus::Indexed);
    assert!(sites[0].last_error.is_none());

    let site_id = sites[0].id;
    assert_eq!(storage.count_pages(site_id).unwrap(), 3);
    assert_eq!(storage.get_lemma(site_id, "fox").unwrap().unwrap().frequency, 2);
    assert_eq!(storage.get_lemma(site_id, "watch").unwrap().unwrap().frequency, 1);
    assert!(storage.get_lemma(site_id, "the").unwrap().is_none());
    assert_frequencies_consistent(&*storage, site_id);
}

#[tokio::test]
async fn test_stop_when_idle_returns_false() {
    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(
        "http://127.0.0.1:1",
        &dir.path().join("index.db"),
    ));

    assert!(!app.service.stop_indexing().await);
}

#[tokio::test]
async fn test_second_full_run_replaces_index() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));

    app.index_all().await;
    app.index_all().await;

    let storage = app.storage.lock();
    let sites = storage.list_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(storage.count_pages(sites[0].id).unwrap(), 3);
    assert_eq!(storage.get_lemma(sites[0].id, "fox").unwrap().unwrap().frequency, 2);
    assert_frequencies_consistent(&*storage, sites[0].id);
}

#[tokio::test]
async fn test_reindex_single_page_removes_vanished_lemma() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));
    app.index_all().await;

    // The birds page loses both "watch" and "fox"
    server.reset().await;
    mount_html(&server, "/birds", "Birds", "<p>Birds sing</p>").await;

    assert!(
        app.service
            .index_single_page(&format!("{}/birds", server.uri()))
            .await
    );

    let storage = app.storage.lock();
    let site_id = storage.list_sites().unwrap()[0].id;
    assert!(storage.get_lemma(site_id, "watch").unwrap().is_none());
    assert_eq!(storage.get_lemma(site_id, "fox").unwrap().unwrap().frequency, 1);
    assert_eq!(storage.get_lemma(site_id, "sing").unwrap().unwrap().frequency, 1);
    assert_eq!(storage.count_pages(site_id).unwrap(), 3);
    assert_frequencies_consistent(&*storage, site_id);
}

#[tokio::test]
async fn test_missing_page_is_stored_without_lemmas() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        "Home",
        r#"<p>orchard</p><a href="/missing">Gone</a>"#,
    )
    .await;

    let dir = tempdir().expect("Failed to create temp dir");
    let app = TestApp::new(create_test_config(&server.uri(), &dir.path().join("index.db")));
    app.index_all().await;

    let storage = app.storage.lock();
    let site = &storage.list_sites().unwrap()[0];
    assert_eq!(site.status, SiteStatus::Indexed);

    let missing = storage
        .get_page(site.id, "/missing")
        .unwrap()
        .expect("404 page should be stored");
    assert_eq!(missing.code, 404);
    assert!(storage.entries_for_page(missing.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_config_file_drives_full_run() {
    let server = MockServer::start().await;
    mount_garden(&server).await;

    let dir = tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("index.db");

    let mut file = NamedTempFile::new().expect("Failed to create config file");
    write!(
        file,
        r#"
[crawler]
max-depth = 1
delay-ms = 0

[storage]
database-path = "{}"

[[sites]]
url = "{}"
name = "Garden"
"#,
        db_path.display(),
        server.uri()
    )
    .unwrap();

    let config = load_config(file.path()).expect("Failed to load config");
    assert_eq!(config.crawler.max_depth, 1);

    let app = TestApp::new(config);
    app.index_all().await;

    let storage = app.storage.lock();
    let site = &storage.list_sites().unwrap()[0];
    assert_eq!(site.name, "Garden");
    assert_eq!(storage.count_pages(site.id).unwrap(), 3);
}
