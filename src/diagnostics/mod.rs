// Diagnostics module
// Sweeps sample queries across similarity thresholds to help pick a threshold


use console::style;
use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::search::{SearchEngine, SearchResult, validate_query};

pub const DEFAULT_TUNING_THRESHOLDS: [f32; 4] = [0.7, 0.5, 0.3, 0.1];

pub const DEFAULT_TUNING_QUERIES: [&str; 6] = [
    "What projects have you completed recently?",
    "Do you renovate old timber houses?",
    "How do I get a quote?",
    "What certifications do you hold?",
    "What does faîtage mean?",
    "How can I contact you?",
];

const PREVIEW_CHARS: usize = 80;

/// Results of one query at one threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub query: String,
    pub threshold: f32,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdSummary {
    pub threshold: f32,
    /// Queries with at least one result at this threshold
    pub queries_with_hits: usize,
    pub total_hits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub rows: Vec<SweepRow>,
    pub summary: Vec<ThresholdSummary>,
}

/// Run every query at every threshold
#[inline]
pub async fn sweep(
    engine: &SearchEngine,
    queries: &[String],
    thresholds: &[f32],
    max_results: usize,
) -> Result<SweepReport> {
    sweep_with(engine, queries, thresholds, max_results, |_| {}).await
}

/// Like [`sweep`], calling `on_row` for each row as soon as its query is done.
///
/// All parameters are validated before the first query is embedded. The first
/// failing query aborts the sweep; earlier queries stay reported.
#[inline]
pub async fn sweep_with<F>(
    engine: &SearchEngine,
    queries: &[String],
    thresholds: &[f32],
    max_results: usize,
    mut on_row: F,
) -> Result<SweepReport>
where
    F: FnMut(&SweepRow) + Send,
{
    for query in queries {
        for &threshold in thresholds {
            validate_query(query, threshold, max_results)?;
        }
    }

    info!(
        "Sweeping {} queries across {} thresholds",
        queries.len(),
        thresholds.len()
    );

    let mut rows = Vec::with_capacity(queries.len() * thresholds.len());
    for query in queries {
        let query_vector = engine.embed_query(query).await?;

        // A query is reported only once it succeeded at every threshold
        let mut query_rows = Vec::with_capacity(thresholds.len());
        for &threshold in thresholds {
            let results = engine
                .match_vector(&query_vector, threshold, max_results, None)
                .await?;
            debug!(
                "{:?} at {}: {} results",
                query,
                threshold,
                results.len()
            );

            query_rows.push(SweepRow {
                query: query.clone(),
                threshold,
                results,
            });
        }

        for row in &query_rows {
            on_row(row);
        }
        rows.extend(query_rows);
    }

    let summary = summarize(&rows, thresholds);
    Ok(SweepReport { rows, summary })
}

/// Per-threshold hit counts, in the order the thresholds were given
#[inline]
pub fn summarize(rows: &[SweepRow], thresholds: &[f32]) -> Vec<ThresholdSummary> {
    thresholds
        .iter()
        .map(|&threshold| {
            let at_threshold = rows.iter().filter(|row| row.threshold == threshold);
            let (queries_with_hits, total_hits) =
                at_threshold.fold((0, 0), |(with_hits, hits), row| {
                    (
                        with_hits + usize::from(!row.results.is_empty()),
                        hits + row.results.len(),
                    )
                });
            ThresholdSummary {
                threshold,
                queries_with_hits,
                total_hits,
            }
        })
        .collect()
}

/// Similarity as a percentage, one decimal
#[inline]
pub fn format_similarity(similarity: f32) -> String {
    format!("{:.1}%", similarity * 100.0)
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= PREVIEW_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Text block for one sweep row
#[inline]
pub fn format_row(row: &SweepRow) -> String {
    let mut lines = vec![format!(
        "  threshold {:.2}: {} result(s)",
        row.threshold,
        row.results.len()
    )];

    if row.results.is_empty() {
        lines.push("    no results above threshold".to_string());
    }

    for (rank, result) in row.results.iter().enumerate() {
        lines.push(format!(
            "    {}. [{}] {}/{}  {}",
            rank + 1,
            format_similarity(result.similarity),
            result.content_type,
            result.content_id,
            preview(&result.content_text)
        ));
    }

    lines.join("\n")
}

/// Print one row as it arrives, with a query header before its first threshold
#[inline]
pub fn print_row(row: &SweepRow, first_for_query: bool) {
    if first_for_query {
        println!();
        println!("{} {}", style("Query:").bold(), style(&row.query).cyan());
    }

    let text = format_row(row);
    if row.results.is_empty() {
        println!("{}", style(text).dim());
    } else {
        println!("{text}");
    }
}

#[inline]
pub fn print_summary(summary: &[ThresholdSummary], query_count: usize) {
    println!();
    println!("{}", style("Threshold summary").bold());
    for entry in summary {
        println!(
            "  {:.2}: {}/{} queries with results, {} results total",
            entry.threshold, entry.queries_with_hits, query_count, entry.total_hits
        );
    }
}
