//! Screenshot discovery chain against a mock GitHub API

mod common;

use common::{init_test_logging, mock_config};
use pretty_assertions::assert_eq;
use serde_json::json;
use themedex_core::catalog::ScreenshotDiscovery;
use themedex_core::config::GalleryConfig;
use themedex_core::transport::Transport;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "https://github.com/foo/bar";

fn discovery(config: &GalleryConfig) -> ScreenshotDiscovery {
    let transport = Transport::new(config.retry_policy()).unwrap();
    ScreenshotDiscovery::new(transport, config.github.clone(), &config.discovery)
}

fn listing_entry(name: &str) -> serde_json::Value {
    json!({
        "type": "file",
        "name": name,
        "path": format!("screenshots/{name}"),
        "download_url": format!("https://raw.githubusercontent.com/foo/bar/main/screenshots/{name}")
    })
}

#[tokio::test]
async fn test_folder_images_sorted_and_readme_skipped() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/contents/screenshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            listing_entry("b.png"),
            listing_entry("notes.md"),
            listing_entry("a.png"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("![x](shot.png)"))
        .expect(0)
        .mount(&server)
        .await;

    let screenshots = discovery(&config).discover(REPO).await;

    assert_eq!(
        screenshots,
        vec![
            "https://raw.githubusercontent.com/foo/bar/main/screenshots/a.png".to_string(),
            "https://raw.githubusercontent.com/foo/bar/main/screenshots/b.png".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_folder_without_images_falls_through_to_next_folder() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/contents/screenshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([listing_entry("README.md")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/contents/assets/screenshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([listing_entry("cover.webp")])))
        .expect(1)
        .mount(&server)
        .await;

    let screenshots = discovery(&config).discover(REPO).await;

    assert_eq!(
        screenshots,
        vec!["https://raw.githubusercontent.com/foo/bar/main/screenshots/cover.webp".to_string()]
    );
}

#[tokio::test]
async fn test_readme_images_skip_badges() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# Bar\n\n![build](https://img.shields.io/badge/build-passing.png)\n\n![x](shot1.png)\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let screenshots = discovery(&config).discover(REPO).await;

    assert_eq!(
        screenshots,
        vec!["https://raw.githubusercontent.com/foo/bar/main/shot1.png".to_string()]
    );
}

#[tokio::test]
async fn test_social_preview_when_nothing_found() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    let screenshots = discovery(&config).discover(REPO).await;

    assert_eq!(
        screenshots,
        vec!["https://opengraph.githubassets.com/1/foo/bar".to_string()]
    );
}

#[tokio::test]
async fn test_failing_readme_falls_through_to_social_preview() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/readme"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let screenshots = discovery(&config).discover(REPO).await;

    assert_eq!(
        screenshots,
        vec!["https://opengraph.githubassets.com/1/foo/bar".to_string()]
    );
}

#[tokio::test]
async fn test_non_github_repository_has_no_screenshots() {
    init_test_logging();
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());

    let screenshots = discovery(&config)
        .discover("https://gitlab.com/foo/bar")
        .await;

    assert!(screenshots.is_empty());
}

#[tokio::test]
async fn test_manifest_field_runs_first_when_enabled() {
    init_test_logging();
    let server = MockServer::start().await;
    let mut config = mock_config(&server.uri());
    config.discovery.manifest_field = true;

    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/contents/package.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "slidev-theme-bar",
            "slidev": {"screenshots": ["/docs/cover.png", "https://example.com/demo.png"]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github/repos/foo/bar/contents/screenshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([listing_entry("a.png")])))
        .expect(0)
        .mount(&server)
        .await;

    let discovery = discovery(&config);
    assert_eq!(
        discovery.strategy_names(),
        vec!["manifest", "folders", "readme", "social-preview"]
    );

    let screenshots = discovery.discover(REPO).await;
    assert_eq!(
        screenshots,
        vec![
            "https://raw.githubusercontent.com/foo/bar/main/docs/cover.png".to_string(),
            "https://example.com/demo.png".to_string(),
        ]
    );
}
