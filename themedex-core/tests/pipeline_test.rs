//! End-to-end pipeline runs against a mock registry and GitHub API

mod common;

use common::{init_test_logging, mock_config};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use themedex_core::catalog::{
    enrich_downloads, CatalogAssembler, CatalogRecord, CatalogSource, CatalogStore,
    FallbackSource, LiveSource, RegistryClient, SnapshotLocation, SnapshotSource,
};
use themedex_core::transport::Transport;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_object(name: &str, repository: &str) -> serde_json::Value {
    json!({
        "package": {
            "name": name,
            "version": "1.0.0",
            "description": format!("{name} description"),
            "keywords": ["slidev-theme"],
            "date": "2024-05-01T00:00:00.000Z",
            "links": {"repository": repository},
            "publisher": {"username": "someone"}
        }
    })
}

async fn mount_search(server: &MockServer, objects: Vec<serde_json::Value>) {
    let total = objects.len();
    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .and(query_param("text", "keywords:slidev-theme"))
        .and(query_param("from", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": objects,
            "total": total
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pipeline_orders_by_downloads_with_stable_ties() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    mount_search(
        &server,
        vec![
            search_object("slidev-theme-alpha", "https://github.com/acme/alpha"),
            search_object("@slidev/theme-bravo", "https://github.com/slidevjs/themes.git"),
            search_object("slidev-addon-unrelated", "https://github.com/acme/addon"),
            search_object("slidev-theme-charlie", "https://github.com/acme/charlie"),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/downloads/point/last-week/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slidev-theme-alpha": {"downloads": 10},
            "@slidev/theme-bravo": {"downloads": 50},
            "slidev-theme-charlie": {"downloads": 10}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let assembler = CatalogAssembler::new(config).unwrap();
    let snapshot = assembler.assemble().await.unwrap();

    let names: Vec<&str> = snapshot
        .records()
        .iter()
        .map(|r| r.package_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["@slidev/theme-bravo", "slidev-theme-alpha", "slidev-theme-charlie"]
    );

    let summary = snapshot.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.official, 1);
    assert_eq!(summary.community, 2);
    assert_eq!(summary.with_screenshots, 3);

    // Nothing in the mock repositories, so every record gets its social preview
    assert_eq!(
        snapshot.records()[0].screenshots,
        vec!["https://opengraph.githubassets.com/1/slidevjs/themes".to_string()]
    );
    assert_eq!(
        snapshot.records()[0].repository_url.as_deref(),
        Some("https://github.com/slidevjs/themes")
    );
}

#[tokio::test]
async fn test_pipeline_pages_until_total_reached() {
    init_test_logging();
    let server = MockServer::start().await;
    let mut config = mock_config(&server.uri());
    config.registry.page_size = 1;
    config.discovery.enabled = false;

    for (from, name) in [("0", "slidev-theme-one"), ("1", "slidev-theme-two")] {
        Mock::given(method("GET"))
            .and(path("/-/v1/search"))
            .and(query_param("from", from))
            .and(query_param("size", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "objects": [search_object(name, "https://github.com/acme/x")],
                "total": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let snapshot = CatalogAssembler::new(config)
        .unwrap()
        .assemble()
        .await
        .unwrap();

    assert_eq!(snapshot.records().len(), 2);
    assert!(snapshot.records().iter().all(|r| r.screenshots.is_empty()));
    assert!(snapshot.records().iter().all(|r| r.downloads.is_none()));
}

#[tokio::test]
async fn test_pipeline_fails_when_search_fails() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = CatalogAssembler::new(config)
        .unwrap()
        .assemble()
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("HTTP 500"));
}

#[tokio::test]
async fn test_pipeline_drops_packages_repeated_across_pages() {
    init_test_logging();
    let server = MockServer::start().await;
    let mut config = mock_config(&server.uri());
    config.discovery.enabled = false;

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .and(query_param("from", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [
                search_object("slidev-theme-a", "https://github.com/acme/a"),
                search_object("slidev-theme-b", "https://github.com/acme/b"),
            ],
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Ranking shifted: b slides onto the second page as well
    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .and(query_param("from", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [search_object("slidev-theme-b", "https://github.com/acme/b")],
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = CatalogAssembler::new(config)
        .unwrap()
        .assemble()
        .await
        .unwrap();

    let mut names: Vec<&str> = snapshot
        .records()
        .iter()
        .map(|r| r.package_name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["slidev-theme-a", "slidev-theme-b"]);
    assert_eq!(snapshot.summary().total, 2);
}

#[tokio::test]
async fn test_failed_download_batch_is_skipped() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    let now = chrono::Utc::now();
    let mut records: Vec<CatalogRecord> = (0..130)
        .map(|i| CatalogRecord::new(format!("slidev-theme-{i}"), now))
        .collect();

    let first_batch: serde_json::Map<String, serde_json::Value> = (0..128)
        .map(|i| (format!("slidev-theme-{i}"), json!({"downloads": i})))
        .collect();

    Mock::given(method("GET"))
        .and(path_regex(r"^/downloads/point/last-week/slidev-theme-0,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_batch))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/downloads/point/last-week/slidev-theme-128,slidev-theme-129$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(config.retry_policy()).unwrap();
    let stats = enrich_downloads(&transport, &config.registry.downloads_url, &mut records).await;

    assert_eq!(stats.batches, 2);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(records[0].downloads, Some(0));
    assert_eq!(records[127].downloads, Some(127));
    assert_eq!(records[128].downloads, None);
    assert_eq!(records[129].downloads, None);
}

#[tokio::test]
async fn test_package_details_encodes_scope_slash() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path_regex(r"^/registry/@slidev%2Ftheme-seriph$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "@slidev/theme-seriph",
            "license": "MIT"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(config.retry_policy()).unwrap();
    let client = RegistryClient::new(&transport, &config.registry);
    let details = client.package_details("@slidev/theme-seriph").await.unwrap();

    assert_eq!(details["license"], "MIT");
}

#[tokio::test]
async fn test_store_falls_back_to_live_pipeline() {
    init_test_logging();
    let server = MockServer::start().await;
    let mut config = mock_config(&server.uri());
    config.discovery.enabled = false;

    mount_search(
        &server,
        vec![search_object("slidev-theme-alpha", "https://github.com/acme/alpha")],
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("themes.json");

    let source = FallbackSource::new(
        Box::new(SnapshotSource::new(SnapshotLocation::File(missing))),
        Box::new(LiveSource::new(CatalogAssembler::new(config).unwrap())),
    );
    let mut store = CatalogStore::new(Box::new(source));
    store.load().await.unwrap();

    assert_eq!(store.total_count(), 1);
    assert_eq!(store.find("alpha").unwrap().package_name, "slidev-theme-alpha");
}

#[tokio::test]
async fn test_snapshot_source_over_http() {
    init_test_logging();
    let server = MockServer::start().await;

    let record = CatalogRecord::new("slidev-theme-remote", chrono::Utc::now());
    Mock::given(method("GET"))
        .and(path("/data/themes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .mount(&server)
        .await;

    let source = SnapshotSource::new(SnapshotLocation::parse(&format!(
        "{}/data/themes.json",
        server.uri()
    )));
    let records = source.load_catalog().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "remote");
}

#[tokio::test]
async fn test_snapshot_source_http_error() {
    init_test_logging();
    let server = MockServer::start().await;

    let source = SnapshotSource::new(SnapshotLocation::parse(&format!(
        "{}/data/themes.json",
        server.uri()
    )));
    let err = source.load_catalog().await.unwrap_err();

    assert!(err.to_string().contains("404"));
}
