// Indexer module
// Rebuilds the embedding store from the content source, domain by domain


use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{RagError, Result};
use crate::config::Config;
use crate::content::{ContentSource, ContentType, Domain, NormalizedContent, normalize_domain};
use crate::embeddings::{EmbeddingProvider, EmbeddingProviderError};
use crate::store::{EmbeddingRecord, EmbeddingStore};

const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// What happens when a single item cannot be embedded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Skip the item, count it, keep going
    #[default]
    BestEffort,
    /// Fail the domain and stop the run
    Strict,
}

impl std::fmt::Display for FailurePolicy {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            FailurePolicy::BestEffort => write!(f, "best-effort"),
            FailurePolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Retries of retryable provider errors, with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    #[inline]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerOptions {
    /// Maximum embedding requests in flight
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
    pub max_text_chars: usize,
    /// When set, vectors of any other length are rejected
    pub expected_dimension: Option<usize>,
    pub show_progress: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            failure_policy: FailurePolicy::BestEffort,
            retry: RetryPolicy::default(),
            max_text_chars: 8000,
            expected_dimension: None,
            show_progress: false,
        }
    }
}

impl IndexerOptions {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.indexing.concurrency,
            failure_policy: config.indexing.failure_policy,
            retry: RetryPolicy {
                attempts: config.indexing.retry_attempts,
                base_delay: DEFAULT_RETRY_BASE_DELAY,
            },
            max_text_chars: config.indexing.max_text_chars,
            expected_dimension: usize::try_from(config.embedding.dimension).ok(),
            show_progress: false,
        }
    }
}

/// Items written per domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCounts {
    pub projects: usize,
    pub faq: usize,
    pub lexique: usize,
    pub certifications: usize,
    pub services: usize,
    pub company_info: usize,
}

impl IndexCounts {
    #[inline]
    pub fn get(&self, domain: Domain) -> usize {
        match domain {
            Domain::Projects => self.projects,
            Domain::Faq => self.faq,
            Domain::Lexique => self.lexique,
            Domain::Certifications => self.certifications,
            Domain::Services => self.services,
            Domain::CompanyInfo => self.company_info,
        }
    }

    fn set(&mut self, domain: Domain, count: usize) {
        let slot = match domain {
            Domain::Projects => &mut self.projects,
            Domain::Faq => &mut self.faq,
            Domain::Lexique => &mut self.lexique,
            Domain::Certifications => &mut self.certifications,
            Domain::Services => &mut self.services,
            Domain::CompanyInfo => &mut self.company_info,
        };
        *slot = count;
    }

    #[inline]
    pub fn total(&self) -> usize {
        Domain::ALL.iter().map(|domain| self.get(*domain)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFailure {
    pub content_type: ContentType,
    pub error: String,
}

/// Outcome of a reindex run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexSummary {
    #[serde(flatten)]
    pub counts: IndexCounts,
    pub total: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
    /// Items dropped after embedding failures under the best-effort policy
    pub skipped: usize,
    pub failures: Vec<DomainFailure>,
}

impl ReindexSummary {
    fn from_run(counts: IndexCounts, skipped: usize, failures: Vec<DomainFailure>) -> Self {
        let total = counts.total();
        let success = failures.is_empty();

        let error = (!success).then(|| {
            failures
                .iter()
                .map(|f| format!("{}: {}", f.content_type, f.error))
                .collect::<Vec<_>>()
                .join("; ")
        });

        let skipped_note = if skipped > 0 {
            format!(", {skipped} skipped")
        } else {
            String::new()
        };
        let message = if success {
            format!("Indexed {total} items{skipped_note}")
        } else {
            format!(
                "Indexed {total} items{skipped_note}; {} domain(s) failed",
                failures.len()
            )
        };

        Self {
            counts,
            total,
            success,
            error,
            message,
            skipped,
            failures,
        }
    }

    /// The store could not be cleared, nothing was indexed
    fn aborted(error: String) -> Self {
        Self {
            counts: IndexCounts::default(),
            total: 0,
            success: false,
            message: format!("Reindex aborted: {error}"),
            error: Some(error),
            skipped: 0,
            failures: Vec::new(),
        }
    }
}

fn is_provider_wide(error: &RagError) -> bool {
    match *error {
        RagError::EmbeddingProvider(ref e) => e.is_provider_wide(),
        _ => false,
    }
}

/// Result of indexing one domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DomainOutcome {
    written: usize,
    skipped: usize,
}

pub struct Indexer {
    store: Arc<dyn EmbeddingStore>,
    provider: Arc<dyn EmbeddingProvider>,
    source: Arc<dyn ContentSource>,
    options: IndexerOptions,
}

impl Indexer {
    #[inline]
    pub fn new(
        store: Arc<dyn EmbeddingStore>,
        provider: Arc<dyn EmbeddingProvider>,
        source: Arc<dyn ContentSource>,
        options: IndexerOptions,
    ) -> Self {
        Self {
            store,
            provider,
            source,
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// Clear the whole store, then rebuild every domain in order.
    ///
    /// Never returns an error: every failure is reported in the summary.
    #[inline]
    pub async fn reindex_all(&self) -> ReindexSummary {
        info!(
            "Starting full reindex with {} ({} policy, concurrency {})",
            self.provider.model(),
            self.options.failure_policy,
            self.options.concurrency
        );

        match self.store.delete_all().await {
            Ok(deleted) => debug!("Cleared {} existing embeddings", deleted),
            Err(e) => {
                error!("Failed to clear embeddings: {}", e);
                return ReindexSummary::aborted(e.to_string());
            }
        }

        let mut counts = IndexCounts::default();
        let mut skipped = 0;
        let mut failures = Vec::new();

        for domain in Domain::ALL {
            match self.index_domain(domain).await {
                Ok(outcome) => {
                    counts.set(domain, outcome.written);
                    skipped += outcome.skipped;
                }
                Err(e) => {
                    error!("Failed to index {}: {}", domain, e);
                    failures.push(DomainFailure {
                        content_type: domain.content_type(),
                        error: e.to_string(),
                    });
                    if self.options.failure_policy == FailurePolicy::Strict {
                        warn!("Strict policy: stopping reindex after {} failed", domain);
                        break;
                    }
                    if is_provider_wide(&e) {
                        warn!("Stopping reindex: the embedding provider rejects every request");
                        break;
                    }
                }
            }
        }

        let summary = ReindexSummary::from_run(counts, skipped, failures);
        info!("{}", summary.message);
        summary
    }

    /// Replace the embeddings of a single domain, leaving the others untouched
    #[inline]
    pub async fn reindex_domain(&self, domain: Domain) -> ReindexSummary {
        let content_type = domain.content_type();
        info!("Starting reindex of {}", domain);

        match self.store.delete_by_type(&content_type).await {
            Ok(deleted) => debug!("Cleared {} existing {} embeddings", deleted, content_type),
            Err(e) => {
                error!("Failed to clear {} embeddings: {}", content_type, e);
                return ReindexSummary::aborted(e.to_string());
            }
        }

        let mut counts = IndexCounts::default();
        let mut skipped = 0;
        let mut failures = Vec::new();

        match self.index_domain(domain).await {
            Ok(outcome) => {
                counts.set(domain, outcome.written);
                skipped = outcome.skipped;
            }
            Err(e) => {
                error!("Failed to index {}: {}", domain, e);
                failures.push(DomainFailure {
                    content_type,
                    error: e.to_string(),
                });
            }
        }

        let summary = ReindexSummary::from_run(counts, skipped, failures);
        info!("{}", summary.message);
        summary
    }

    /// Fetch, normalize, embed and store one domain
    async fn index_domain(&self, domain: Domain) -> Result<DomainOutcome> {
        let items =
            normalize_domain(domain, self.source.as_ref(), self.options.max_text_chars).await?;

        if items.is_empty() {
            debug!("No indexable {} content", domain);
            return Ok(DomainOutcome::default());
        }

        let bar = self.progress_bar(domain, items.len());
        let embedded = self.embed_items(items, &bar).await;
        bar.finish_and_clear();
        let (records, skipped) = embedded?;

        let written = records.len();
        self.store.upsert_many(&records).await?;

        info!(
            "Indexed {} {} items ({} skipped)",
            written, domain, skipped
        );
        Ok(DomainOutcome { written, skipped })
    }

    fn progress_bar(&self, domain: Domain, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Indexing {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_message(domain.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Embed items with bounded concurrency, keeping their order.
    ///
    /// Returns the records and the number of items skipped.
    async fn embed_items(
        &self,
        items: Vec<NormalizedContent>,
        bar: &ProgressBar,
    ) -> Result<(Vec<EmbeddingRecord>, usize)> {
        let concurrency = self.options.concurrency.max(1);
        debug!(
            "Embedding {} items with concurrency {}",
            items.len(),
            concurrency
        );

        let embedded = stream::iter(items).map(|item| async move {
            let result = self.embed_with_retry(&item.content_text).await;
            bar.inc(1);
            match result {
                Ok(embedding) => Ok(EmbeddingRecord {
                    content_type: item.content_type,
                    content_id: item.content_id,
                    content_text: item.content_text,
                    embedding,
                    updated_at: Utc::now(),
                }),
                Err(e) => Err((item.content_type, item.content_id, e)),
            }
        });
        let embedded = embedded.buffered(concurrency);

        match self.options.failure_policy {
            FailurePolicy::Strict => {
                let records: Vec<EmbeddingRecord> = embedded
                    .map_err(|(content_type, content_id, e)| {
                        error!("Failed to embed {}/{}: {}", content_type, content_id, e);
                        e
                    })
                    .try_collect()
                    .await?;
                Ok((records, 0))
            }
            FailurePolicy::BestEffort => {
                // Only failures tied to one input may be skipped
                let results: Vec<_> = embedded
                    .map(|result| match result {
                        Err((content_type, content_id, e)) if e.is_provider_wide() => {
                            error!("Failed to embed {}/{}: {}", content_type, content_id, e);
                            Err(e)
                        }
                        other => Ok(other),
                    })
                    .try_collect()
                    .await?;

                let mut records = Vec::with_capacity(results.len());
                let mut skipped = 0;
                let mut last_error = None;
                for result in results {
                    match result {
                        Ok(record) => records.push(record),
                        Err((content_type, content_id, e)) => {
                            warn!("Skipping {}/{}: {}", content_type, content_id, e);
                            skipped += 1;
                            last_error = Some(e);
                        }
                    }
                }

                if records.is_empty() {
                    if let Some(e) = last_error {
                        error!("All {} items failed to embed", skipped);
                        return Err(e.into());
                    }
                }
                Ok((records, skipped))
            }
        }
    }

    /// One item's embedding, retrying retryable provider errors
    async fn embed_with_retry(
        &self,
        text: &str,
    ) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        let retry = self.options.retry;
        let attempts = retry.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.provider.embed(text).await {
                Ok(vector) => {
                    if attempt > 1 {
                        debug!("Embedding succeeded on attempt {}", attempt);
                    }
                    return self.check_dimension(vector);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = retry.delay_for(attempt);
                    warn!(
                        "Embedding attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn check_dimension(
        &self,
        vector: Vec<f32>,
    ) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        match self.options.expected_dimension {
            Some(expected) if vector.len() != expected => {
                Err(EmbeddingProviderError::MalformedResponse(format!(
                    "expected {expected} dimensions, got {}",
                    vector.len()
                )))
            }
            _ => Ok(vector),
        }
    }
}
