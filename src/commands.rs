use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::content::{ContentSnapshot, ContentType, Domain};
use crate::database::Database;
use crate::diagnostics::{self, DEFAULT_TUNING_QUERIES, DEFAULT_TUNING_THRESHOLDS};
use crate::embeddings::build_provider;
use crate::indexer::{FailurePolicy, Indexer, IndexerOptions, ReindexSummary};
use crate::search::SearchEngine;
use crate::store::EmbeddingStore;

async fn open_database(config: &Config) -> Result<Database> {
    Database::initialize_from_config_dir(config.get_base_dir())
        .await
        .context("Failed to initialize database")
}

/// Replace the site content tables with a JSON snapshot
#[inline]
pub async fn import_content(base_dir: &Path, file: &Path) -> Result<()> {
    let config = Config::load(base_dir)?;
    let snapshot = ContentSnapshot::from_json_file(file)
        .with_context(|| format!("Failed to load content from {}", file.display()))?;

    let database = open_database(&config).await?;
    database.import_content(&snapshot).await?;

    println!(
        "{} Imported {} records from {}",
        style("✓").green(),
        snapshot.record_count(),
        file.display()
    );
    println!("  Projects: {}", snapshot.projects.len());
    println!("  FAQ: {}", snapshot.faq.len());
    println!("  Lexique: {}", snapshot.lexique.len());
    println!("  Certifications: {}", snapshot.certifications.len());
    println!("  Services: {}", snapshot.services.len());
    println!("  Company info: {}", snapshot.company_info.len());
    println!();
    println!("Run 'content-rag reindex' to refresh the embeddings.");

    Ok(())
}

/// Rebuild embeddings for every domain, or for one.
///
/// Returns whether the run succeeded, so the caller can set the exit code.
#[inline]
pub async fn reindex(
    base_dir: &Path,
    domain: Option<Domain>,
    strict: bool,
    json: bool,
) -> Result<bool> {
    let config = Config::load(base_dir)?;
    let provider = build_provider(&config)?;
    let database = Arc::new(open_database(&config).await?);

    let mut options = IndexerOptions::from_config(&config);
    if strict {
        options.failure_policy = FailurePolicy::Strict;
    }
    options.show_progress = !json;

    let indexer = Indexer::new(database.clone(), provider, database, options);
    let summary = match domain {
        Some(domain) => indexer.reindex_domain(domain).await,
        None => indexer.reindex_all().await,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print_reindex_summary(&summary);
    }

    if !summary.success {
        error!("Reindex failed: {}", summary.message);
    }
    Ok(summary.success)
}

fn print_reindex_summary(summary: &ReindexSummary) {
    if summary.success {
        println!("{} {}", style("✓").green(), summary.message);
    } else {
        println!("{} {}", style("✗").red(), summary.message);
    }

    for domain in Domain::ALL {
        println!("  {}: {}", domain, summary.counts.get(domain));
    }
    println!("  Total: {}", style(summary.total).bold());

    if summary.skipped > 0 {
        println!(
            "  {}",
            style(format!("Skipped: {}", summary.skipped)).yellow()
        );
    }

    for failure in &summary.failures {
        println!(
            "  {} {}: {}",
            style("⚠").yellow(),
            failure.content_type,
            failure.error
        );
    }
    if summary.failures.is_empty() {
        if let Some(error) = &summary.error {
            println!("  {} {}", style("⚠").yellow(), error);
        }
    }
}

/// Search indexed content; threshold and limit default to the configuration
#[inline]
pub async fn search(
    base_dir: &Path,
    query: &str,
    threshold: Option<f32>,
    limit: Option<usize>,
    content_type: Option<ContentType>,
) -> Result<()> {
    let config = Config::load(base_dir)?;
    let threshold = threshold.unwrap_or(config.search.threshold);
    let limit = limit.unwrap_or(config.search.max_results);

    crate::search::validate_query(query, threshold, limit)?;
    // A missing index is an error, not an empty result
    config
        .require_credentials()
        .context("Cannot search the embedding store")?;

    let provider = build_provider(&config)?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to open database")?;
    let engine = SearchEngine::new(provider, Arc::new(database));

    info!("Searching for {:?}", query);
    let results = engine
        .search(query, threshold, limit, content_type.as_ref())
        .await?;

    if results.is_empty() {
        println!(
            "No results above threshold {:.2} for {}",
            threshold,
            style(query).cyan()
        );
        return Ok(());
    }

    println!(
        "{} result(s) for {} (threshold {:.2}):",
        results.len(),
        style(query).cyan(),
        threshold
    );
    println!();

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] {}/{}",
            rank + 1,
            style(diagnostics::format_similarity(result.similarity)).green(),
            result.content_type,
            result.content_id
        );
        for line in result.content_text.lines() {
            println!("   {line}");
        }
        println!();
    }

    Ok(())
}

/// Per-content-type counts and freshness of the embedding store
#[inline]
pub async fn show_stats(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir)?;
    let database = open_database(&config).await?;

    let stats = database.stats_by_type().await?;
    if stats.is_empty() {
        println!("No embeddings have been indexed yet.");
        println!("Use 'content-rag reindex' to build the index.");
        return Ok(());
    }

    println!("{}", style("Embedding store").bold());
    println!("{}", "=".repeat(50));

    let mut total = 0;
    for entry in &stats {
        total += entry.count;
        let last_updated = entry.last_updated.map_or_else(
            || "never".to_string(),
            |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        println!(
            "  {:<15} {:>6}   last updated {}",
            entry.content_type.as_str(),
            entry.count,
            last_updated
        );
    }

    println!("{}", "-".repeat(50));
    println!("  {:<15} {:>6}", "total", total);

    Ok(())
}

/// Diagnostics sweep of queries × thresholds
#[inline]
pub async fn tune(
    base_dir: &Path,
    queries: Vec<String>,
    thresholds: Vec<f32>,
    limit: Option<usize>,
) -> Result<()> {
    let config = Config::load(base_dir)?;
    config
        .require_credentials()
        .context("Cannot run the tuning sweep")?;

    let queries = if queries.is_empty() {
        Vec::from(DEFAULT_TUNING_QUERIES.map(str::to_string))
    } else {
        queries
    };
    let thresholds = if thresholds.is_empty() {
        DEFAULT_TUNING_THRESHOLDS.to_vec()
    } else {
        thresholds
    };
    let limit = limit.unwrap_or(config.search.max_results);

    let provider = build_provider(&config)?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to open database")?;
    let engine = SearchEngine::new(provider, Arc::new(database));

    println!(
        "{} {} queries × {} thresholds, top {}",
        style("Tuning sweep:").bold(),
        queries.len(),
        thresholds.len(),
        limit
    );

    let mut last_query: Option<String> = None;
    let report = diagnostics::sweep_with(&engine, &queries, &thresholds, limit, |row| {
        let first_for_query = last_query.as_deref() != Some(row.query.as_str());
        diagnostics::print_row(row, first_for_query);
        last_query = Some(row.query.clone());
    })
    .await?;

    diagnostics::print_summary(&report.summary, queries.len());
    Ok(())
}
