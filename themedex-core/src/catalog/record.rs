//! Catalog record - one theme package in the snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::naming::{extract_theme_id, format_display_name, is_official_theme};
use super::repository::RepoRef;

/// A theme package with its registry metadata and discovered assets
///
/// Serialized with camelCase keys; absent optionals are omitted so the
/// snapshot stays compact. `downloads: None` means "not resolved", which
/// is kept distinct from `Some(0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Canonical theme id, derived from `package_name`
    pub id: String,

    /// Registry package name (unique within a snapshot)
    pub package_name: String,

    /// Human-readable name, derived from `id`
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,

    /// Image URLs; the first one is the primary thumbnail
    #[serde(default)]
    pub screenshots: Vec<String>,

    /// Weekly downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Publish date of the latest version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    pub is_official: bool,

    /// When the snapshot containing this record was generated
    pub fetched_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Create a bare record; every derived field is computed from the package name
    pub fn new(package_name: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        let package_name = package_name.into();
        let id = extract_theme_id(&package_name);
        let display_name = format_display_name(&id);
        let is_official = is_official_theme(&package_name);

        Self {
            id,
            package_name,
            display_name,
            description: None,
            author: None,
            author_url: None,
            version: None,
            repository_url: None,
            registry_url: None,
            demo_url: None,
            screenshots: Vec::new(),
            downloads: None,
            license: None,
            updated_at: None,
            keywords: Vec::new(),
            is_official,
            fetched_at,
        }
    }

    /// Downloads used for ordering; unresolved counts sort as zero
    pub fn download_rank(&self) -> u64 {
        self.downloads.unwrap_or(0)
    }

    pub fn has_screenshots(&self) -> bool {
        !self.screenshots.is_empty()
    }

    /// First screenshot, or the repository's social preview image
    pub fn thumbnail_url(&self, social_preview_base: &str) -> Option<String> {
        if let Some(first) = self.screenshots.first() {
            return Some(first.clone());
        }

        self.repository_url
            .as_deref()
            .and_then(RepoRef::parse)
            .map(|repo| repo.social_preview_url(social_preview_base))
    }

    /// Parsed `updated_at`, if it is a valid RFC 3339 timestamp
    pub fn updated_timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
