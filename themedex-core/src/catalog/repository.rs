//! Source repository resolution
//!
//! Turns the free-form repository link a registry publishes into an
//! owner/repo pair on GitHub. A link that does not point at GitHub simply
//! yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

static REPO_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/([^/]+)/([^/]+)").expect("Invalid regex"));

static OWNER_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/([^/]+)").expect("Invalid regex"));

/// A GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse the first two path segments after the GitHub host
    ///
    /// A trailing `.git` on the repo segment is dropped.
    pub fn parse(url: &str) -> Option<Self> {
        let captures = REPO_PATH.captures(url)?;
        let owner = captures.get(1)?.as_str();
        let repo = captures.get(2)?.as_str();
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Contents API URL for a path inside the repository
    pub fn contents_url(&self, api_base: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    /// README API URL
    pub fn readme_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/readme",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Raw content base for a branch, without a trailing slash
    pub fn raw_base(&self, raw_content_base: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            raw_content_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            branch
        )
    }

    /// Generated social preview image for the repository
    pub fn social_preview_url(&self, social_preview_base: &str) -> String {
        format!(
            "{}/{}/{}",
            social_preview_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

/// Owner segment of a GitHub URL, parsed independently of the repo segment
pub fn extract_owner_handle(url: &str) -> Option<String> {
    OWNER_PATH
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|owner| !owner.is_empty())
}
