//! Registry harvesting
//!
//! Pages through the registry search endpoint, keeps the packages that
//! look like themes, and turns each into a [`CatalogRecord`]. Screenshots
//! are discovered per record, one at a time, with a pause between records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::naming::is_theme_candidate;
use super::record::CatalogRecord;
use super::repository::extract_owner_handle;
use super::screenshots::ScreenshotSource;
use crate::config::{GitHubConfig, RegistryConfig};
use crate::transport::Transport;

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub objects: Vec<SearchObject>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub time: Option<String>,
}

/// A search hit
#[derive(Debug, Clone, Deserialize)]
pub struct SearchObject {
    pub package: RegistryPackage,
    #[serde(default)]
    pub score: Option<serde_json::Value>,
}

/// Package metadata as returned by the search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryPackage {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub links: PackageLinks,
    #[serde(default)]
    pub author: Option<PackageAuthor>,
    #[serde(default)]
    pub publisher: Option<PackagePublisher>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageLinks {
    #[serde(default)]
    pub npm: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub bugs: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackagePublisher {
    #[serde(default)]
    pub username: Option<String>,
}

/// Treat empty strings like missing values
fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Build a record from registry metadata
///
/// Screenshots and downloads are left empty for later enrichment.
pub fn build_record(
    package: &RegistryPackage,
    registry: &RegistryConfig,
    github: &GitHubConfig,
    fetched_at: DateTime<Utc>,
) -> CatalogRecord {
    let mut record = CatalogRecord::new(package.name.clone(), fetched_at);

    let repository_url = package
        .links
        .repository
        .as_deref()
        .map(|url| url.strip_suffix(".git").unwrap_or(url).to_string());

    let author = package.author.as_ref();
    record.author = non_empty(author.and_then(|a| a.name.as_ref()))
        .or_else(|| non_empty(author.and_then(|a| a.username.as_ref())))
        .or_else(|| non_empty(package.publisher.as_ref().and_then(|p| p.username.as_ref())));

    record.author_url = non_empty(author.and_then(|a| a.url.as_ref())).or_else(|| {
        repository_url
            .as_deref()
            .and_then(extract_owner_handle)
            .map(|owner| format!("{}/{}", github.web_url.trim_end_matches('/'), owner))
    });

    record.registry_url = non_empty(package.links.npm.as_ref()).or_else(|| {
        Some(format!(
            "{}/{}",
            registry.package_page_url.trim_end_matches('/'),
            package.name
        ))
    });

    record.description = package.description.clone();
    record.version = package.version.clone();
    record.demo_url = non_empty(package.links.homepage.as_ref());
    record.updated_at = package.date.clone();
    record.keywords = package.keywords.clone();
    record.repository_url = repository_url;

    record
}

/// Thin client over the registry's search and document endpoints
pub struct RegistryClient<'a> {
    transport: &'a Transport,
    registry: &'a RegistryConfig,
}

impl<'a> RegistryClient<'a> {
    pub fn new(transport: &'a Transport, registry: &'a RegistryConfig) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Search URL for a page starting at `from`
    pub fn search_url(&self, from: u64) -> Result<String> {
        let url = Url::parse_with_params(
            &self.registry.search_url,
            &[
                ("text", self.registry.search_text.clone()),
                ("size", self.registry.page_size.to_string()),
                ("from", from.to_string()),
            ],
        )
        .with_context(|| format!("Invalid search URL: {}", self.registry.search_url))?;
        Ok(url.into())
    }

    /// Fetch one search page
    pub async fn search_page(&self, from: u64) -> Result<SearchPage> {
        let url = self.search_url(from)?;
        self.transport
            .get_json(&url, &HeaderMap::new())
            .await
            .with_context(|| format!("Failed to fetch registry search page at offset {from}"))
    }

    /// Full registry document for one package
    pub async fn package_details(&self, package_name: &str) -> Result<serde_json::Value> {
        // Scoped names keep their '@' but the slash must be encoded
        let encoded = package_name.replace('/', "%2F");
        let url = format!(
            "{}/{}",
            self.registry.details_url.trim_end_matches('/'),
            encoded
        );
        self.transport
            .get_json(&url, &HeaderMap::new())
            .await
            .with_context(|| format!("Failed to fetch registry details for {package_name}"))
    }
}

/// Collects theme records from the registry
pub struct Harvester<'a> {
    client: RegistryClient<'a>,
    registry: &'a RegistryConfig,
    github: &'a GitHubConfig,
    screenshots: Option<&'a dyn ScreenshotSource>,
    pause: Duration,
}

impl<'a> Harvester<'a> {
    pub fn new(
        transport: &'a Transport,
        registry: &'a RegistryConfig,
        github: &'a GitHubConfig,
    ) -> Self {
        Self {
            client: RegistryClient::new(transport, registry),
            registry,
            github,
            screenshots: None,
            pause: Duration::ZERO,
        }
    }

    /// Discover screenshots for each record, pausing after every successful lookup
    pub fn with_screenshots(mut self, source: &'a dyn ScreenshotSource, pause: Duration) -> Self {
        self.screenshots = Some(source);
        self.pause = pause;
        self
    }

    /// Page through the registry and build records
    ///
    /// Each package name appears at most once in the result. A search page that cannot be fetched aborts the harvest; a failed
    /// screenshot lookup only leaves that record without screenshots.
    pub async fn harvest(&self, fetched_at: DateTime<Utc>) -> Result<Vec<CatalogRecord>> {
        info!("Fetching themes from registry...");

        let mut records = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut from: u64 = 0;

        loop {
            let page = self.client.search_page(from).await?;
            if page.objects.is_empty() {
                break;
            }

            let returned = page.objects.len() as u64;
            for object in &page.objects {
                let package = &object.package;
                if !is_theme_candidate(&package.name) {
                    debug!("Skipping non-theme package {}", package.name);
                    continue;
                }

                // Offset paging can repeat a package when rankings shift between pages
                if !seen.insert(package.name.clone()) {
                    debug!("Skipping duplicate package {}", package.name);
                    continue;
                }

                debug!("Processing {}", package.name);
                let mut record = build_record(package, self.registry, self.github, fetched_at);
                self.enrich_screenshots(&mut record).await;
                records.push(record);
            }

            from += returned;
            if from >= page.total {
                break;
            }
            info!("Progress: {}/{}", from, page.total);
        }

        info!("Fetched {} themes", records.len());
        Ok(records)
    }

    async fn enrich_screenshots(&self, record: &mut CatalogRecord) {
        let (Some(source), Some(repository_url)) = (self.screenshots, record.repository_url.as_deref())
        else {
            return;
        };

        let result = source.screenshots(repository_url).await;
        match result {
            Ok(screenshots) => {
                record.screenshots = screenshots;
                if !self.pause.is_zero() {
                    tokio::time::sleep(self.pause).await;
                }
            }
            Err(e) => {
                warn!("Failed to fetch screenshots for {}: {:#}", record.package_name, e);
            }
        }
    }
}
