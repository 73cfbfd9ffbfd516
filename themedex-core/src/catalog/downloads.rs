//! Download-count enrichment
//!
//! Looks up weekly downloads in batches of [`DOWNLOAD_BATCH_SIZE`] package
//! names per request. A failed batch is logged and skipped; its records keep
//! `downloads = None`.

use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::record::CatalogRecord;
use crate::transport::{FetchError, Transport};

/// Package names per downloads request
pub const DOWNLOAD_BATCH_SIZE: usize = 128;

/// Count for a single package over the endpoint's window
#[derive(Debug, Clone, Deserialize)]
pub struct PointDownloads {
    pub downloads: u64,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// The endpoint answers with a flat object for one package and a
/// name-keyed map for several
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DownloadsResponse {
    Single(PointDownloads),
    Bulk(HashMap<String, Option<PointDownloads>>),
}

/// Outcome of an enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub batches: usize,
    pub failed_batches: usize,
}

/// Apply a response to its batch
///
/// A single-package shape is credited to the batch's first record no
/// matter how many names the batch held.
pub fn apply_downloads(batch: &mut [CatalogRecord], response: DownloadsResponse) {
    match response {
        DownloadsResponse::Single(point) => {
            if let Some(first) = batch.first_mut() {
                first.downloads = Some(point.downloads);
            }
        }
        DownloadsResponse::Bulk(counts) => {
            for record in batch.iter_mut() {
                if let Some(Some(point)) = counts.get(&record.package_name) {
                    record.downloads = Some(point.downloads);
                }
            }
        }
    }
}

/// Request URL for a batch
pub fn batch_url(downloads_url: &str, batch: &[CatalogRecord]) -> String {
    let names = batch
        .iter()
        .map(|r| r.package_name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}/{}", downloads_url.trim_end_matches('/'), names)
}

/// Fill in `downloads` for every record the endpoint knows about
pub async fn enrich_downloads(
    transport: &Transport,
    downloads_url: &str,
    records: &mut [CatalogRecord],
) -> DownloadStats {
    info!("Fetching download counts...");

    let total_batches = records.len().div_ceil(DOWNLOAD_BATCH_SIZE);
    let mut stats = DownloadStats::default();

    for (index, batch) in records.chunks_mut(DOWNLOAD_BATCH_SIZE).enumerate() {
        stats.batches += 1;
        let url = batch_url(downloads_url, batch);

        let response: Result<DownloadsResponse, FetchError> =
            transport.get_json(&url, &HeaderMap::new()).await;

        match response {
            Ok(response) => {
                apply_downloads(batch, response);
                info!("Batch {}/{}", index + 1, total_batches);
            }
            Err(e) => {
                stats.failed_batches += 1;
                warn!(
                    "Failed to fetch downloads for batch {}/{}: {}",
                    index + 1,
                    total_batches,
                    e
                );
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn records(names: &[&str]) -> Vec<CatalogRecord> {
        let now = Utc::now();
        names.iter().map(|n| CatalogRecord::new(*n, now)).collect()
    }

    #[test]
    fn test_parse_single_response() {
        let json = r#"{"downloads":1234,"start":"2025-01-01","end":"2025-01-07","package":"slidev-theme-a"}"#;
        let response: DownloadsResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response, DownloadsResponse::Single(ref p) if p.downloads == 1234));
    }

    #[test]
    fn test_parse_bulk_response_with_null() {
        let json = r#"{
            "slidev-theme-a": {"downloads": 10, "start": "s", "end": "e", "package": "slidev-theme-a"},
            "slidev-theme-b": null
        }"#;
        let response: DownloadsResponse = serde_json::from_str(json).unwrap();
        match response {
            DownloadsResponse::Bulk(map) => {
                assert_eq!(map.len(), 2);
                assert!(map["slidev-theme-b"].is_none());
            }
            other => panic!("expected bulk response, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_bulk_per_key() {
        let mut batch = records(&["slidev-theme-a", "slidev-theme-b", "slidev-theme-c"]);
        let response: DownloadsResponse = serde_json::from_str(
            r#"{"slidev-theme-a": {"downloads": 10}, "slidev-theme-b": null, "slidev-theme-c": {"downloads": 0}}"#,
        )
        .unwrap();

        apply_downloads(&mut batch, response);
        assert_eq!(batch[0].downloads, Some(10));
        assert_eq!(batch[1].downloads, None);
        assert_eq!(batch[2].downloads, Some(0));
    }

    /// Known edge case: a single-package shape is credited to the first
    /// record even when the batch held several names.
    #[test]
    fn test_single_shape_credits_first_record_only() {
        let mut batch = records(&["slidev-theme-a", "slidev-theme-b"]);
        let response: DownloadsResponse =
            serde_json::from_str(r#"{"downloads": 42, "package": "slidev-theme-b"}"#).unwrap();

        apply_downloads(&mut batch, response);
        assert_eq!(batch[0].downloads, Some(42));
        assert_eq!(batch[1].downloads, None);
    }

    #[test]
    fn test_batch_url_joins_names() {
        let batch = records(&["slidev-theme-a", "@slidev/theme-b"]);
        assert_eq!(
            batch_url("https://api.npmjs.org/downloads/point/last-week/", &batch),
            "https://api.npmjs.org/downloads/point/last-week/slidev-theme-a,@slidev/theme-b"
        );
    }
}
