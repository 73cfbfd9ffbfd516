//! Screenshot discovery
//!
//! Finds preview images for a theme by asking a chain of strategies in
//! order and stopping at the first one that finds something:
//!
//! ```text
//! [package.json field]  (opt-in)
//!        │ not found
//!        ▼
//! conventional folders  screenshots/, assets/screenshots/, ...
//!        │ not found
//!        ▼
//! README images         markdown ![..](..) then <img src="..">
//!        │ not found
//!        ▼
//! social preview        generated image keyed by owner/repo
//! ```
//!
//! A strategy that errors is treated as "not found" and the chain moves on.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use super::repository::RepoRef;
use crate::config::{DiscoveryConfig, GitHubConfig};
use crate::transport::{FetchError, Transport};

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

/// Image file extensions, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// URLs containing any of these are badges or icons, not screenshots
pub const IMAGE_DENYLIST: &[&str] = &["shields.io", "badge", "icon"];

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)!\[.*?\]\((.*?\.(?:png|jpe?g|gif|webp))\)").expect("Invalid regex")
});

static HTML_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+\.(?:png|jpe?g|gif|webp))["']"#)
        .expect("Invalid regex")
});

/// Outcome of a single strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(Vec<String>),
    NotFound,
}

impl Discovery {
    fn from_urls(urls: Vec<String>) -> Self {
        if urls.is_empty() {
            Discovery::NotFound
        } else {
            Discovery::Found(urls)
        }
    }
}

/// Everything a strategy needs to inspect one repository
pub struct DiscoveryContext<'a> {
    pub transport: &'a Transport,
    pub github: &'a GitHubConfig,
    pub repo: &'a RepoRef,
}

impl DiscoveryContext<'_> {
    fn raw_base(&self) -> String {
        self.repo
            .raw_base(&self.github.raw_content_url, &self.github.default_branch)
    }
}

/// One way of finding screenshots
#[async_trait]
pub trait ScreenshotStrategy: Send + Sync {
    /// Strategy identifier for logging
    fn name(&self) -> &'static str;

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Discovery>;
}

/// Anything that can produce screenshots for a repository URL
///
/// The harvester depends on this rather than on [`ScreenshotDiscovery`] directly.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn screenshots(&self, repository_url: &str) -> Result<Vec<String>>;
}

/// Entry of a GitHub contents listing
#[derive(Debug, Clone, Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    #[serde(default)]
    download_url: Option<String>,
}

/// Reads `slidev.screenshots` or `screenshots` from the repository's package.json
pub struct ManifestField;

#[async_trait]
impl ScreenshotStrategy for ManifestField {
    fn name(&self) -> &'static str {
        "manifest"
    }

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Discovery> {
        let url = ctx.repo.contents_url(&ctx.github.api_url, "package.json");
        let manifest: serde_json::Value = ctx
            .transport
            .get_json(&url, &ctx.github.headers(ACCEPT_RAW))
            .await?;

        let field = manifest
            .get("slidev")
            .and_then(|s| s.get("screenshots"))
            .or_else(|| manifest.get("screenshots"));

        let raw: Vec<String> = match field {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        };

        let base = ctx.raw_base();
        Ok(Discovery::from_urls(
            raw.iter().map(|u| resolve_image_url(u, &base)).collect(),
        ))
    }
}

/// Lists conventional screenshot folders until one contains images
pub struct FolderProbe {
    pub folders: Vec<String>,
}

#[async_trait]
impl ScreenshotStrategy for FolderProbe {
    fn name(&self) -> &'static str {
        "folders"
    }

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Discovery> {
        let headers = ctx.github.headers(ACCEPT_JSON);

        for folder in &self.folders {
            let url = ctx.repo.contents_url(&ctx.github.api_url, folder);
            let listing: serde_json::Value = match ctx.transport.get_json(&url, &headers).await {
                Ok(listing) => listing,
                Err(e) => {
                    debug!("No {} folder in {}: {}", folder, ctx.repo.slug(), e);
                    continue;
                }
            };

            // A file at this path lists as an object, not an array
            if !listing.is_array() {
                continue;
            }

            let entries: Vec<ContentEntry> = match serde_json::from_value(listing) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Unexpected listing for {} in {}: {}", folder, ctx.repo.slug(), e);
                    continue;
                }
            };

            let screenshots = image_download_urls(entries);
            if !screenshots.is_empty() {
                debug!(
                    "Found {} screenshots in {} for {}",
                    screenshots.len(),
                    folder,
                    ctx.repo.slug()
                );
                return Ok(Discovery::Found(screenshots));
            }
        }

        Ok(Discovery::NotFound)
    }
}

/// Extracts image references from the repository README
pub struct ReadmeImages {
    pub limit: usize,
}

#[async_trait]
impl ScreenshotStrategy for ReadmeImages {
    fn name(&self) -> &'static str {
        "readme"
    }

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Discovery> {
        let url = ctx.repo.readme_url(&ctx.github.api_url);
        let readme = ctx
            .transport
            .get_text(&url, &ctx.github.headers(ACCEPT_RAW))
            .await?;

        let screenshots = extract_readme_images(&readme, &ctx.raw_base(), self.limit);
        if !screenshots.is_empty() {
            debug!(
                "Extracted {} screenshots from README of {}",
                screenshots.len(),
                ctx.repo.slug()
            );
        }
        Ok(Discovery::from_urls(screenshots))
    }
}

/// Always succeeds with the repository's generated social preview
pub struct SocialPreview;

#[async_trait]
impl ScreenshotStrategy for SocialPreview {
    fn name(&self) -> &'static str {
        "social-preview"
    }

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Discovery> {
        Ok(Discovery::Found(vec![ctx
            .repo
            .social_preview_url(&ctx.github.social_preview_url)]))
    }
}

/// Ordered strategy chain over a shared transport
pub struct ScreenshotDiscovery {
    transport: Transport,
    github: GitHubConfig,
    strategies: Vec<Box<dyn ScreenshotStrategy>>,
}

impl ScreenshotDiscovery {
    /// Build the default chain for the given settings
    pub fn new(transport: Transport, github: GitHubConfig, discovery: &DiscoveryConfig) -> Self {
        let mut strategies: Vec<Box<dyn ScreenshotStrategy>> = Vec::new();
        if discovery.manifest_field {
            strategies.push(Box::new(ManifestField));
        }
        strategies.push(Box::new(FolderProbe {
            folders: discovery.folders.clone(),
        }));
        strategies.push(Box::new(ReadmeImages {
            limit: discovery.readme_image_limit,
        }));
        strategies.push(Box::new(SocialPreview));

        Self::with_strategies(transport, github, strategies)
    }

    /// Build a chain from explicit strategies
    pub fn with_strategies(
        transport: Transport,
        github: GitHubConfig,
        strategies: Vec<Box<dyn ScreenshotStrategy>>,
    ) -> Self {
        Self {
            transport,
            github,
            strategies,
        }
    }

    /// Names of the configured strategies, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Screenshots for a repository URL; empty when the URL is not a GitHub repository
    pub async fn discover(&self, repository_url: &str) -> Vec<String> {
        let Some(repo) = RepoRef::parse(repository_url) else {
            debug!("No GitHub repository in {}", repository_url);
            return Vec::new();
        };

        let ctx = DiscoveryContext {
            transport: &self.transport,
            github: &self.github,
            repo: &repo,
        };

        for strategy in &self.strategies {
            match strategy.discover(&ctx).await {
                Ok(Discovery::Found(urls)) if !urls.is_empty() => {
                    debug!("{}: {} via {}", repo.slug(), urls.len(), strategy.name());
                    return urls;
                }
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {
                    debug!("{}: nothing at {} ({})", strategy.name(), repo.slug(), e);
                }
                Err(e) => {
                    warn!("{} strategy failed for {}: {:#}", strategy.name(), repo.slug(), e);
                }
            }
        }

        Vec::new()
    }
}

#[async_trait]
impl ScreenshotSource for ScreenshotDiscovery {
    async fn screenshots(&self, repository_url: &str) -> Result<Vec<String>> {
        Ok(self.discover(repository_url).await)
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<FetchError>()
        .is_some_and(FetchError::is_not_found)
}

/// True if the file name ends in a known image extension
pub fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn image_download_urls(entries: Vec<ContentEntry>) -> Vec<String> {
    let mut images: Vec<(String, String)> = entries
        .into_iter()
        .filter(|e| e.kind == "file" && is_image_file(&e.name))
        .filter_map(|e| e.download_url.map(|url| (e.path, url)))
        .collect();

    images.sort_by(|a, b| a.0.cmp(&b.0));
    images.into_iter().map(|(_, url)| url).collect()
}

fn is_denied(url: &str) -> bool {
    let lower = url.to_lowercase();
    IMAGE_DENYLIST.iter().any(|marker| lower.contains(marker))
}

/// Make an image reference absolute against a raw content base
///
/// Absolute URLs pass through; `/x.png` becomes `<base>/x.png`; `x.png` becomes `<base>/x.png`.
pub fn resolve_image_url(url: &str, raw_base: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{raw_base}{url}")
    } else {
        format!("{raw_base}/{url}")
    }
}

/// Image URLs referenced by a README, in document order
///
/// Markdown images come before `<img>` tags. Badges and icons are dropped
/// and at most `limit` URLs are returned.
pub fn extract_readme_images(readme: &str, raw_base: &str, limit: usize) -> Vec<String> {
    let markdown = MARKDOWN_IMAGE
        .captures_iter(readme)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));
    let html = HTML_IMAGE
        .captures_iter(readme)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));

    markdown
        .chain(html)
        .filter(|url| !url.is_empty() && !is_denied(url))
        .map(|url| resolve_image_url(url, raw_base))
        .take(limit)
        .collect()
}
