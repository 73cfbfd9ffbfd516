//! Test helper functions for integration tests
//!
//! Shared across the test files using the tests/common/ pattern.

use std::sync::Once;
use themedex_core::config::GalleryConfig;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Configuration with every outbound endpoint pointed at a mock server
///
/// Raw content and social preview bases keep their defaults; they are only
/// used to build URLs, never fetched.
pub fn mock_config(server_uri: &str) -> GalleryConfig {
    let mut config = GalleryConfig::default();

    config.registry.search_url = format!("{server_uri}/-/v1/search");
    config.registry.downloads_url = format!("{server_uri}/downloads/point/last-week");
    config.registry.details_url = format!("{server_uri}/registry");

    config.github.api_url = format!("{server_uri}/github");
    config.github.token_env = "THEMEDEX_TEST_TOKEN_UNSET".to_string();

    config.discovery.pause_ms = 0;
    config.retry.backoff_ms = 10;

    config
}
