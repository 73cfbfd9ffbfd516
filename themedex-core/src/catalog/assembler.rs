//! Catalog assembly
//!
//! Runs harvest, screenshot discovery and download enrichment in sequence,
//! orders the result and freezes it into a [`Snapshot`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::downloads::enrich_downloads;
use super::harvest::Harvester;
use super::record::CatalogRecord;
use super::screenshots::ScreenshotDiscovery;
use crate::config::GalleryConfig;
use crate::transport::Transport;

/// Counters reported alongside a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub total: usize,
    pub official: usize,
    pub community: usize,
    pub with_screenshots: usize,
}

impl CatalogSummary {
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        let official = records.iter().filter(|r| r.is_official).count();
        Self {
            total: records.len(),
            official,
            community: records.len() - official,
            with_screenshots: records.iter().filter(|r| r.has_screenshots()).count(),
        }
    }
}

/// Order by downloads, highest first; unresolved counts as zero and ties keep encounter order
pub fn sort_by_downloads(records: &mut [CatalogRecord]) {
    records.sort_by(|a, b| b.download_rank().cmp(&a.download_rank()));
}

/// One immutable pipeline result
#[derive(Debug, Clone)]
pub struct Snapshot {
    generated_at: DateTime<Utc>,
    records: Vec<CatalogRecord>,
    summary: CatalogSummary,
}

impl Snapshot {
    /// Freeze records into a snapshot, sorting them by downloads
    pub fn new(generated_at: DateTime<Utc>, mut records: Vec<CatalogRecord>) -> Self {
        sort_by_downloads(&mut records);
        let summary = CatalogSummary::from_records(&records);
        Self {
            generated_at,
            records,
            summary,
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn summary(&self) -> CatalogSummary {
        self.summary
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }

    /// Pretty-printed JSON array of records
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.records).context("Failed to serialize snapshot")
    }

    /// Write the JSON array to `path`, creating parent directories
    ///
    /// Returns the number of bytes written.
    pub async fn write_to(&self, path: &Path) -> Result<usize> {
        let content = self.to_json()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }

        tokio::fs::write(path, &content)
            .await
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

        info!("Saved {} themes to {}", self.records.len(), path.display());
        Ok(content.len())
    }
}

/// Read a snapshot JSON array back into records
pub async fn read_snapshot(path: &Path) -> Result<Vec<CatalogRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// Wires the pipeline stages together from one configuration
pub struct CatalogAssembler {
    config: GalleryConfig,
    transport: Transport,
    discovery: ScreenshotDiscovery,
}

impl CatalogAssembler {
    pub fn new(config: GalleryConfig) -> Result<Self> {
        let transport = Transport::new(config.retry_policy())?;
        let discovery =
            ScreenshotDiscovery::new(transport.clone(), config.github.clone(), &config.discovery);

        Ok(Self {
            config,
            transport,
            discovery,
        })
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Run the full pipeline
    ///
    /// Fails only when the registry search itself fails.
    pub async fn assemble(&self) -> Result<Snapshot> {
        let generated_at = Utc::now();

        let mut harvester =
            Harvester::new(&self.transport, &self.config.registry, &self.config.github);
        if self.config.discovery.enabled {
            harvester = harvester.with_screenshots(&self.discovery, self.config.discovery.pause());
        }

        let mut records = harvester.harvest(generated_at).await?;

        let stats =
            enrich_downloads(&self.transport, &self.config.registry.downloads_url, &mut records)
                .await;
        if stats.failed_batches > 0 {
            info!(
                "{} of {} download batches failed",
                stats.failed_batches, stats.batches
            );
        }

        let snapshot = Snapshot::new(generated_at, records);
        let summary = snapshot.summary();
        info!(
            total = summary.total,
            official = summary.official,
            community = summary.community,
            with_screenshots = summary.with_screenshots,
            "Catalog assembled"
        );

        Ok(snapshot)
    }
}
