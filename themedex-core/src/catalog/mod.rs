//! Themedex Catalog - Slidev theme aggregation
//!
//! This module discovers published Slidev themes, enriches them with
//! screenshots and download counts, and freezes the result into a snapshot
//! that clients can browse.
//!
//! # Overview
//!
//! The pipeline:
//! - Harvests theme candidates from the package registry search
//! - Discovers screenshots from each theme's GitHub repository
//! - Looks up weekly download counts in batches
//! - Writes a JSON snapshot ordered by downloads
//!
//! # Architecture
//!
//! ```text
//! Package registry search (paged)
//!     │
//!     ▼
//! Harvester ──────────► ScreenshotDiscovery (per record)
//!     │                     manifest → folders → README → social preview
//!     ▼
//! enrich_downloads      ← batches of 128 names
//!     │
//!     ▼
//! Snapshot              → public/data/themes.json
//!     │
//!     ▼
//! CatalogStore          ← SnapshotSource, else LiveSource
//! ```

mod assembler;
mod downloads;
mod harvest;
mod naming;
mod record;
mod repository;
mod screenshots;
mod store;

pub use assembler::{read_snapshot, sort_by_downloads, CatalogAssembler, CatalogSummary, Snapshot};
pub use downloads::{
    apply_downloads, batch_url, enrich_downloads, DownloadStats, DownloadsResponse,
    PointDownloads, DOWNLOAD_BATCH_SIZE,
};
pub use harvest::{
    build_record, Harvester, PackageAuthor, PackageLinks, PackagePublisher, RegistryClient,
    RegistryPackage, SearchObject, SearchPage,
};
pub use naming::{
    extract_theme_id, format_display_name, is_official_theme, is_theme_candidate,
    COMMUNITY_PREFIX, OFFICIAL_PREFIX, THEME_MARKER,
};
pub use record::CatalogRecord;
pub use repository::{extract_owner_handle, RepoRef};
pub use screenshots::{
    extract_readme_images, is_image_file, resolve_image_url, Discovery, DiscoveryContext,
    FolderProbe, ManifestField, ReadmeImages, ScreenshotDiscovery, ScreenshotSource,
    ScreenshotStrategy, SocialPreview, IMAGE_DENYLIST, IMAGE_EXTENSIONS,
};
pub use store::{
    CatalogQuery, CatalogSource, CatalogStore, FallbackSource, LiveSource, SnapshotLocation,
    SnapshotSource, SortOrder,
};
