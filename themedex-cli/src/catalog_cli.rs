//! Themedex catalog CLI commands
//!
//! Provides commands for building a catalog snapshot and for searching
//! and inspecting the themes in it.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use themedex_core::catalog::{
    CatalogAssembler, CatalogQuery, CatalogRecord, CatalogSource, CatalogStore, FallbackSource,
    LiveSource, RegistryClient, SnapshotLocation, SnapshotSource, SortOrder,
};
use themedex_core::config::GalleryConfig;

#[derive(Subcommand, Debug)]
pub enum CatalogSubcommand {
    /// Run the pipeline and write the catalog snapshot
    Fetch {
        /// Output file (defaults to the configured output path)
        #[clap(long, short)]
        output: Option<PathBuf>,

        /// Skip screenshot discovery
        #[clap(long)]
        no_screenshots: bool,
    },

    /// Search themes in the catalog
    Search {
        /// Search query (matches name, description, author)
        query: Option<String>,

        /// Only official themes
        #[clap(long, conflicts_with = "community_only")]
        official_only: bool,

        /// Only community themes
        #[clap(long)]
        community_only: bool,

        /// Sort order: downloads, name or updated
        #[clap(long, default_value = "downloads")]
        sort: SortOrder,

        /// Maximum number of results
        #[clap(long)]
        limit: Option<usize>,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        /// Snapshot file or URL (defaults to the configured output path)
        #[clap(long)]
        snapshot: Option<String>,

        /// Ignore any snapshot and run the pipeline live
        #[clap(long)]
        live: bool,
    },

    /// Show detailed information about a theme
    Show {
        /// Theme name, display name or package name
        name: String,

        /// Output as JSON
        #[clap(long)]
        json: bool,

        /// Also fetch the full registry document
        #[clap(long)]
        registry: bool,

        /// Snapshot file or URL (defaults to the configured output path)
        #[clap(long)]
        snapshot: Option<String>,
    },
}

impl CatalogSubcommand {
    pub async fn execute(self, config: GalleryConfig) -> Result<()> {
        match self {
            CatalogSubcommand::Fetch {
                output,
                no_screenshots,
            } => execute_fetch(config, output, no_screenshots).await,
            CatalogSubcommand::Search {
                query,
                official_only,
                community_only,
                sort,
                limit,
                json,
                snapshot,
                live,
            } => {
                let query = CatalogQuery {
                    text: query,
                    include_official: !community_only,
                    include_community: !official_only,
                    sort,
                };
                execute_search(config, query, limit, json, snapshot, live).await
            }
            CatalogSubcommand::Show {
                name,
                json,
                registry,
                snapshot,
            } => execute_show(config, &name, json, registry, snapshot).await,
        }
    }
}

/// Snapshot first, then the live pipeline
fn catalog_source(
    config: &GalleryConfig,
    snapshot: Option<String>,
    live_only: bool,
) -> Result<Box<dyn CatalogSource>> {
    let live: Box<dyn CatalogSource> =
        Box::new(LiveSource::new(CatalogAssembler::new(config.clone())?));
    if live_only {
        return Ok(live);
    }

    let location = match snapshot {
        Some(location) => SnapshotLocation::parse(&location),
        None => SnapshotLocation::File(config.output.clone()),
    };

    Ok(Box::new(FallbackSource::new(
        Box::new(SnapshotSource::new(location)),
        live,
    )))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn format_downloads(downloads: Option<u64>) -> String {
    downloads.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Table row for the fetch summary
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

async fn execute_fetch(
    mut config: GalleryConfig,
    output: Option<PathBuf>,
    no_screenshots: bool,
) -> Result<()> {
    if no_screenshots {
        config.discovery.enabled = false;
    }
    let output = output.unwrap_or_else(|| config.output.clone());

    let assembler = CatalogAssembler::new(config)?;
    let snapshot = assembler.assemble().await?;
    let bytes = snapshot.write_to(&output).await?;

    let summary = snapshot.summary();
    let rows = vec![
        SummaryRow {
            metric: "Total themes",
            value: summary.total.to_string(),
        },
        SummaryRow {
            metric: "Official",
            value: summary.official.to_string(),
        },
        SummaryRow {
            metric: "Community",
            value: summary.community.to_string(),
        },
        SummaryRow {
            metric: "With screenshots",
            value: summary.with_screenshots.to_string(),
        },
        SummaryRow {
            metric: "File size",
            value: format!("{:.2} KB", bytes as f64 / 1024.0),
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("\nSaved catalog to {}\n", output.display());
    println!("{table}");

    Ok(())
}

/// Table row for search results
#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Downloads")]
    downloads: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&CatalogRecord> for SearchResultRow {
    fn from(record: &CatalogRecord) -> Self {
        Self {
            name: record.display_name.clone(),
            package: record.package_name.clone(),
            downloads: format_downloads(record.downloads),
            author: record.author.clone().unwrap_or_default(),
            description: truncate(record.description.as_deref().unwrap_or(""), 50),
        }
    }
}

async fn execute_search(
    config: GalleryConfig,
    query: CatalogQuery,
    limit: Option<usize>,
    json_output: bool,
    snapshot: Option<String>,
    live: bool,
) -> Result<()> {
    let mut store = CatalogStore::new(catalog_source(&config, snapshot, live)?);
    store.load().await?;

    let mut results = store.query(&query);
    if let Some(limit) = limit {
        results.truncate(limit);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("\nNo themes found.");
        return Ok(());
    }

    println!(
        "\nFound {} theme(s) of {}:\n",
        results.len(),
        store.total_count()
    );

    let table_rows: Vec<SearchResultRow> = results.iter().map(|r| (*r).into()).collect();
    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");

    Ok(())
}

async fn execute_show(
    config: GalleryConfig,
    name: &str,
    json_output: bool,
    with_registry: bool,
    snapshot: Option<String>,
) -> Result<()> {
    let mut store = CatalogStore::new(catalog_source(&config, snapshot, false)?);
    store.load().await?;

    let record = store
        .find(name)
        .with_context(|| format!("Theme '{name}' not found in catalog"))?;

    let details = if with_registry {
        info!("Fetching registry details for {}", record.package_name);
        let transport = themedex_core::transport::Transport::new(config.retry_policy())?;
        let client = RegistryClient::new(&transport, &config.registry);
        Some(client.package_details(&record.package_name).await?)
    } else {
        None
    };

    if json_output {
        let mut output = serde_json::to_value(record)?;
        if let (Some(details), Some(object)) = (details, output.as_object_mut()) {
            object.insert("registry".to_string(), details);
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("Theme:     {}", record.display_name);
    println!("Package:   {}", record.package_name);
    println!(
        "Kind:      {}",
        if record.is_official { "official" } else { "community" }
    );
    if let Some(version) = &record.version {
        println!("Version:   {version}");
    }
    if let Some(author) = &record.author {
        match &record.author_url {
            Some(url) => println!("Author:    {author} ({url})"),
            None => println!("Author:    {author}"),
        }
    }
    println!("Downloads: {} (last week)", format_downloads(record.downloads));
    if let Some(updated) = &record.updated_at {
        println!("Updated:   {updated}");
    }
    if !record.keywords.is_empty() {
        println!("Keywords:  {}", record.keywords.join(", "));
    }

    if let Some(description) = &record.description {
        println!();
        println!("Description:");
        for line in description.lines() {
            println!("  {line}");
        }
    }

    println!();
    println!("Links:");
    for (label, url) in [
        ("Registry", &record.registry_url),
        ("Repository", &record.repository_url),
        ("Demo", &record.demo_url),
    ] {
        if let Some(url) = url {
            println!("  {label}: {url}");
        }
    }

    if let Some(thumbnail) = record.thumbnail_url(&config.github.social_preview_url) {
        println!();
        println!("Thumbnail: {thumbnail}");
    }
    if record.screenshots.len() > 1 {
        println!("Screenshots:");
        for url in &record.screenshots {
            println!("  {url}");
        }
    }

    if let Some(details) = details {
        println!();
        println!("Registry document:");
        if let Some(license) = details.get("license").and_then(|l| l.as_str()) {
            println!("  License: {license}");
        }
        if let Some(latest) = details
            .get("dist-tags")
            .and_then(|t| t.get("latest"))
            .and_then(|v| v.as_str())
        {
            println!("  Latest:  {latest}");
        }
        if let Some(count) = details.get("versions").and_then(|v| v.as_object()).map(|v| v.len()) {
            println!("  Versions published: {count}");
        }
    }

    Ok(())
}
