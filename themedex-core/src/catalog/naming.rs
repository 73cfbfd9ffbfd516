//! Theme identifier normalization
//!
//! Pure functions mapping a registry package name to the catalog's id,
//! display name and official flag.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of packages published under the official scope
pub const OFFICIAL_PREFIX: &str = "@slidev/theme-";

/// Prefix of unscoped community packages
pub const COMMUNITY_PREFIX: &str = "slidev-theme-";

/// Marker that identifies theme packages in a name
pub const THEME_MARKER: &str = "slidev-theme";

/// `@<org>/slidev-theme-<rest>`
static SCOPED_COMMUNITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([^/]+)/slidev-theme-(.+)$").expect("Invalid regex"));

/// Canonical theme id for a package name
///
/// `@slidev/theme-x` -> `x`, `slidev-theme-x` -> `x`,
/// `@org/slidev-theme-x` -> `org/x`, anything else unchanged.
pub fn extract_theme_id(package_name: &str) -> String {
    if let Some(rest) = package_name.strip_prefix(OFFICIAL_PREFIX) {
        return rest.to_string();
    }

    if let Some(rest) = package_name.strip_prefix(COMMUNITY_PREFIX) {
        return rest.to_string();
    }

    if let Some(captures) = SCOPED_COMMUNITY.captures(package_name) {
        return format!("{}/{}", &captures[1], &captures[2]);
    }

    package_name.to_string()
}

/// True iff the package lives under the official scope and prefix
pub fn is_official_theme(package_name: &str) -> bool {
    package_name.starts_with(OFFICIAL_PREFIX)
}

/// Coarse relevance filter for search results
///
/// Accepts anything mentioning the theme marker or a generic `theme-`.
pub fn is_theme_candidate(package_name: &str) -> bool {
    package_name.contains(THEME_MARKER) || package_name.contains("theme-")
}

/// Split an id on `-`, `_` and `/`, capitalize each segment and join with spaces
///
/// Empty segments are kept, so `-foo` becomes ` Foo`.
pub fn format_display_name(id: &str) -> String {
    id.split(|c: char| matches!(c, '-' | '_' | '/'))
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
