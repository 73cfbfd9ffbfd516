//! Catalog store - the client's view of a catalog
//!
//! Owns the loaded records and answers filtered, sorted queries over them.
//! Records come from a [`CatalogSource`]; the usual wiring is "snapshot
//! file, else run the pipeline live" via [`FallbackSource`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::assembler::{read_snapshot, CatalogAssembler};
use super::naming::{COMMUNITY_PREFIX, OFFICIAL_PREFIX};
use super::record::CatalogRecord;

/// Somewhere a catalog can be loaded from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Source identifier for logging
    fn name(&self) -> &'static str;

    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>>;
}

/// Where a pre-generated snapshot lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotLocation {
    File(PathBuf),
    Url(String),
}

impl SnapshotLocation {
    /// `http(s)://...` is a URL, anything else a file path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SnapshotLocation::Url(location.to_string())
        } else {
            SnapshotLocation::File(PathBuf::from(location))
        }
    }
}

/// Loads a snapshot produced by an earlier pipeline run
pub struct SnapshotSource {
    location: SnapshotLocation,
    client: reqwest::Client,
}

impl SnapshotSource {
    pub fn new(location: SnapshotLocation) -> Self {
        Self {
            location,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CatalogSource for SnapshotSource {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>> {
        match &self.location {
            SnapshotLocation::File(path) => read_snapshot(path).await,
            SnapshotLocation::Url(url) => {
                // Plain fetch: a missing snapshot should fall back quickly, not retry
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch snapshot from {url}"))?;

                if !response.status().is_success() {
                    anyhow::bail!("Failed to fetch snapshot: HTTP {} from {}", response.status(), url);
                }

                response
                    .json()
                    .await
                    .with_context(|| format!("Failed to parse snapshot from {url}"))
            }
        }
    }
}

/// Runs the whole pipeline on demand
pub struct LiveSource {
    assembler: CatalogAssembler,
}

impl LiveSource {
    pub fn new(assembler: CatalogAssembler) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl CatalogSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>> {
        Ok(self.assembler.assemble().await?.into_records())
    }
}

/// Tries `primary`, and on any error `fallback`
pub struct FallbackSource {
    primary: Box<dyn CatalogSource>,
    fallback: Box<dyn CatalogSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn CatalogSource>, fallback: Box<dyn CatalogSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl CatalogSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>> {
        match self.primary.load_catalog().await {
            Ok(records) => {
                info!("Loaded {} themes from {}", records.len(), self.primary.name());
                Ok(records)
            }
            Err(e) => {
                warn!(
                    "Failed to load {} catalog, falling back to {}: {:#}",
                    self.primary.name(),
                    self.fallback.name(),
                    e
                );
                self.fallback.load_catalog().await
            }
        }
    }
}

/// Sort orders offered to clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most downloaded first
    #[default]
    Downloads,
    /// Display name, A to Z
    Name,
    /// Most recently published first
    Updated,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "downloads" => Ok(SortOrder::Downloads),
            "name" => Ok(SortOrder::Name),
            "updated" => Ok(SortOrder::Updated),
            other => Err(format!(
                "Unknown sort order '{other}' (expected downloads, name or updated)"
            )),
        }
    }
}

/// Filter and sort settings for [`CatalogStore::query`]
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    /// Case-insensitive substring over name, description and author
    pub text: Option<String>,
    pub include_official: bool,
    pub include_community: bool,
    pub sort: SortOrder,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            text: None,
            include_official: true,
            include_community: true,
            sort: SortOrder::default(),
        }
    }
}

impl CatalogQuery {
    fn matches(&self, record: &CatalogRecord) -> bool {
        if record.is_official && !self.include_official {
            return false;
        }
        if !record.is_official && !self.include_community {
            return false;
        }

        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                let contains = |value: Option<&str>| {
                    value
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                };
                contains(Some(&record.display_name))
                    || contains(record.description.as_deref())
                    || contains(record.author.as_deref())
            }
        }
    }
}

fn compare(sort: SortOrder, a: &CatalogRecord, b: &CatalogRecord) -> Ordering {
    match sort {
        SortOrder::Downloads => b.download_rank().cmp(&a.download_rank()),
        SortOrder::Name => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.display_name.cmp(&b.display_name)),
        SortOrder::Updated => b.updated_timestamp().cmp(&a.updated_timestamp()),
    }
}

/// Loaded catalog plus derived views
pub struct CatalogStore {
    source: Box<dyn CatalogSource>,
    records: Vec<CatalogRecord>,
    loaded: bool,
    last_error: Option<String>,
}

impl CatalogStore {
    pub fn new(source: Box<dyn CatalogSource>) -> Self {
        Self {
            source,
            records: Vec::new(),
            loaded: false,
            last_error: None,
        }
    }

    /// Load the catalog once
    ///
    /// Calls after a successful load are no-ops. A failed load leaves the
    /// store empty and unloaded so a later call can try again.
    pub async fn load(&mut self) -> Result<()> {
        if self.loaded {
            debug!("Catalog already loaded, skipping");
            return Ok(());
        }

        match self.source.load_catalog().await {
            Ok(records) => {
                self.records = records;
                self.loaded = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(format!("{e:#}"));
                Err(e).context("Failed to load catalog")
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// Records matching the query, in the requested order
    pub fn query(&self, query: &CatalogQuery) -> Vec<&CatalogRecord> {
        let mut results: Vec<&CatalogRecord> =
            self.records.iter().filter(|r| query.matches(r)).collect();
        results.sort_by(|a, b| compare(query.sort, a, b));
        results
    }

    /// Official records among the query results
    pub fn official<'a>(&'a self, query: &CatalogQuery) -> Vec<&'a CatalogRecord> {
        self.query(query).into_iter().filter(|r| r.is_official).collect()
    }

    /// Community records among the query results
    pub fn community<'a>(&'a self, query: &CatalogQuery) -> Vec<&'a CatalogRecord> {
        self.query(query).into_iter().filter(|r| !r.is_official).collect()
    }

    /// Look up a record by display name, package name or bare theme name
    pub fn find(&self, name: &str) -> Option<&CatalogRecord> {
        let community = format!("{COMMUNITY_PREFIX}{name}");
        let official = format!("{OFFICIAL_PREFIX}{name}");

        self.records.iter().find(|r| {
            r.display_name == name
                || r.package_name == name
                || r.package_name == community
                || r.package_name == official
        })
    }
}
