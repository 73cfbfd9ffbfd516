//! Pipeline configuration
//!
//! Every endpoint, limit and pause used by the pipeline lives here so the
//! whole run can be pointed at a different registry (or a mock server).
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. `--config <path>` passed on the command line
//! 2. `~/.config/themedex/config.yaml` - per-user config
//! 3. Built-in defaults
//!
//! Every field is optional; an empty file yields the defaults.
//!
//! ```yaml
//! registry:
//!   page_size: 100
//! github:
//!   token_env: MY_GITHUB_TOKEN
//! discovery:
//!   pause_ms: 250
//! output: dist/themes.json
//! ```

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::RetryPolicy;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Package registry endpoints and search settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Source-control endpoints
    #[serde(default)]
    pub github: GitHubConfig,

    /// Screenshot discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Transport retry settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Where the snapshot JSON is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            github: GitHubConfig::default(),
            discovery: DiscoveryConfig::default(),
            retry: RetrySettings::default(),
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("public/data/themes.json")
}

/// Registry (npm) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Package search endpoint
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Search text sent as the `text` query parameter
    #[serde(default = "default_search_text")]
    pub search_text: String,

    /// Objects requested per search page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Point download-count endpoint (package names are appended)
    #[serde(default = "default_downloads_url")]
    pub downloads_url: String,

    /// Base of the human-facing package page
    #[serde(default = "default_package_page_url")]
    pub package_page_url: String,

    /// Base of the full package document endpoint
    #[serde(default = "default_details_url")]
    pub details_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            search_text: default_search_text(),
            page_size: default_page_size(),
            downloads_url: default_downloads_url(),
            package_page_url: default_package_page_url(),
            details_url: default_details_url(),
        }
    }
}

fn default_search_url() -> String {
    "https://registry.npmjs.org/-/v1/search".to_string()
}

fn default_search_text() -> String {
    "keywords:slidev-theme".to_string()
}

fn default_page_size() -> usize {
    250
}

fn default_downloads_url() -> String {
    "https://api.npmjs.org/downloads/point/last-week".to_string()
}

fn default_package_page_url() -> String {
    "https://www.npmjs.com/package".to_string()
}

fn default_details_url() -> String {
    "https://registry.npmjs.org".to_string()
}

/// GitHub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Raw file content base
    #[serde(default = "default_raw_content_url")]
    pub raw_content_url: String,

    /// Web base, used to build author profile links
    #[serde(default = "default_web_url")]
    pub web_url: String,

    /// Social preview image generator base (owner/repo are appended)
    #[serde(default = "default_social_preview_url")]
    pub social_preview_url: String,

    /// Branch used to resolve relative README image paths
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Environment variable holding an optional API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            raw_content_url: default_raw_content_url(),
            web_url: default_web_url(),
            social_preview_url: default_social_preview_url(),
            default_branch: default_branch(),
            token_env: default_token_env(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_content_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_social_preview_url() -> String {
    "https://opengraph.githubassets.com/1".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl GitHubConfig {
    /// Read the API token from the configured environment variable
    ///
    /// A missing or empty variable is not an error; requests simply run
    /// with the anonymous rate limit.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Headers for a GitHub API request with the given `Accept` media type
    pub fn headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        if let Some(token) = self.token() {
            match HeaderValue::from_str(&format!("token {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    tracing::warn!(
                        "Ignoring {}: value is not a valid header",
                        self.token_env
                    );
                }
            }
        }

        headers
    }
}

/// Screenshot discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Whether screenshots are discovered at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Conventional screenshot folders, probed in order
    #[serde(default = "default_folders")]
    pub folders: Vec<String>,

    /// Maximum number of images taken from a README
    #[serde(default = "default_readme_image_limit")]
    pub readme_image_limit: usize,

    /// Read `screenshots` from the repository's package.json before probing folders
    #[serde(default)]
    pub manifest_field: bool,

    /// Pause after each record's screenshot discovery, in milliseconds
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            folders: default_folders(),
            readme_image_limit: default_readme_image_limit(),
            manifest_field: false,
            pause_ms: default_pause_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_folders() -> Vec<String> {
    ["screenshots", "assets/screenshots", "docs/screenshots", ".github/screenshots"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_readme_image_limit() -> usize {
    3
}

fn default_pause_ms() -> u64 {
    500
}

/// Retry settings for outbound requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step; attempt N waits `backoff_ms * N`
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts,
            backoff_step: Duration::from_millis(settings.backoff_ms),
        }
    }
}

impl GalleryConfig {
    /// Load configuration, preferring an explicit path over the per-user file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_from_path(path)
            }
            None => match Self::default_config_path() {
                Some(path) => Self::load_from_path(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path, falling back to defaults if absent
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content).context("Failed to parse config YAML")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).context("Failed to serialize config")
    }

    /// Per-user config file location, if a config directory can be determined
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "themedex", "themedex")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("themedex")))
            .map(|dir| dir.join("config.yaml"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}
