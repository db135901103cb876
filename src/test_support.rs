// Test doubles shared by the unit tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use crate::content::{ContentSnapshot, ContentType, FaqEntry, LexiconTerm, Project};
use crate::database::Database;
use crate::embeddings::{EmbeddingProvider, EmbeddingProviderError};
use crate::search::SearchResult;
use crate::store::{EmbeddingRecord, EmbeddingStats, EmbeddingStore};
use crate::{RagError, Result};

/// Dimensions of [`KeywordEmbedder`] vectors
pub const KEYWORDS: [&str; 8] = [
    "roof",
    "timber",
    "chalet",
    "insulation",
    "winter",
    "quote",
    "ridge",
    "warranty",
];

pub const KEYWORD_DIMENSION: usize = KEYWORDS.len() + 1;

/// Deterministic embedder: one dimension per keyword occurrence count, plus a
/// small constant so no vector is ever zero
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|keyword| lowered.matches(keyword).count() as f32)
            .collect();
        vector.push(0.1);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbeddingProviderError::EmptyInput);
        }
        Ok(Self::vector_for(text))
    }
}

/// Always fails with the given error
#[derive(Debug)]
pub struct FailingProvider {
    error: EmbeddingProviderError,
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new(error: EmbeddingProviderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn model(&self) -> &str {
        "failing-test"
    }

    async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Fails the first `failures` calls with a rate limit, then embeds normally
#[derive(Debug)]
pub struct FlakyProvider {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn model(&self) -> &str {
        "flaky-test"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(EmbeddingProviderError::RateLimited);
        }
        Ok(KeywordEmbedder::vector_for(text))
    }
}

/// Rejects any text containing `marker`, embeds the rest
#[derive(Debug)]
pub struct PoisonedProvider {
    marker: &'static str,
}

impl PoisonedProvider {
    pub fn new(marker: &'static str) -> Self {
        Self { marker }
    }
}

#[async_trait]
impl EmbeddingProvider for PoisonedProvider {
    fn model(&self) -> &str {
        "poisoned-test"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        if text.contains(self.marker) {
            return Err(EmbeddingProviderError::Status(400));
        }
        Ok(KeywordEmbedder::vector_for(text))
    }
}

/// Records the highest number of concurrent `embed` calls
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ConcurrencyProbe {
    fn model(&self) -> &str {
        "probe-test"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(KeywordEmbedder::vector_for(text))
    }
}

/// Which store operations a [`FaultyStore`] should fail
#[derive(Debug, Default, Clone)]
pub struct StoreFaults {
    pub delete_all: bool,
    pub upsert_type: Option<ContentType>,
    pub match_embeddings: bool,
}

/// Wraps a real store and injects storage errors
pub struct FaultyStore {
    inner: Database,
    faults: StoreFaults,
    calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Database, faults: StoreFaults) -> Self {
        Self {
            inner,
            faults,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of store calls made, of any kind
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingStore for FaultyStore {
    async fn upsert_many(&self, records: &[EmbeddingRecord]) -> Result<u64> {
        self.record_call();
        if let Some(content_type) = &self.faults.upsert_type {
            if records.iter().any(|r| &r.content_type == content_type) {
                return Err(RagError::Storage(format!(
                    "injected upsert failure for {content_type}"
                )));
            }
        }
        self.inner.upsert_many(records).await
    }

    async fn delete_by_type(&self, content_type: &ContentType) -> Result<u64> {
        self.record_call();
        EmbeddingStore::delete_by_type(&self.inner, content_type).await
    }

    async fn delete_all(&self) -> Result<u64> {
        self.record_call();
        if self.faults.delete_all {
            return Err(RagError::Storage("injected delete failure".to_string()));
        }
        EmbeddingStore::delete_all(&self.inner).await
    }

    async fn stats_by_type(&self) -> Result<Vec<EmbeddingStats>> {
        self.record_call();
        self.inner.stats_by_type().await
    }

    async fn match_embeddings(
        &self,
        query_vector: &[f32],
        threshold: f32,
        limit: usize,
        filter: Option<&ContentType>,
    ) -> Result<Vec<SearchResult>> {
        self.record_call();
        if self.faults.match_embeddings {
            return Err(RagError::Storage("injected match failure".to_string()));
        }
        self.inner
            .match_embeddings(query_vector, threshold, limit, filter)
            .await
    }

    async fn count(&self) -> Result<i64> {
        self.record_call();
        EmbeddingStore::count(&self.inner).await
    }
}

pub async fn test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let database = Database::initialize_from_config_dir(temp_dir.path())
        .await
        .expect("Failed to create test database");
    (temp_dir, database)
}

pub fn keyword_provider() -> Arc<KeywordEmbedder> {
    Arc::new(KeywordEmbedder::new())
}

fn project(id: i64, title: &str, description: &str) -> Project {
    Project {
        id,
        title: title.to_string(),
        description: Some(description.to_string()),
        location: Some("Haute-Savoie".to_string()),
        category: None,
        year: Some(2022),
        published: true,
        deleted_at: None,
    }
}

fn faq(id: i64, question: &str, answer: &str) -> FaqEntry {
    FaqEntry {
        id,
        question: question.to_string(),
        answer: answer.to_string(),
        category: None,
        published: true,
        deleted_at: None,
    }
}

/// Three live projects, two live FAQ entries and one lexicon term, plus
/// unpublished and soft-deleted records that must never be indexed
pub fn fixture_snapshot() -> ContentSnapshot {
    let deleted_at = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp");

    let mut draft = project(4, "Draft chalet", "Unpublished chalet project");
    draft.published = false;
    let mut removed = project(5, "Removed roof", "Soft-deleted roof project");
    removed.deleted_at = Some(deleted_at);
    let mut hidden_faq = faq(3, "Hidden winter question?", "Not published.");
    hidden_faq.published = false;

    ContentSnapshot {
        projects: vec![
            project(
                1,
                "Chalet renovation",
                "Timber frame chalet renovation with a new roof",
            ),
            project(2, "Barn insulation", "Insulation of an old timber barn"),
            project(3, "Roof repair", "Roof repair after a hard winter"),
            draft,
            removed,
        ],
        faq: vec![
            faq(
                1,
                "Do you work in winter?",
                "Yes, roof work continues in winter when the weather is dry.",
            ),
            faq(
                2,
                "How do I get a quote?",
                "Send us a quote request with photos of the site.",
            ),
            hidden_faq,
        ],
        lexique: vec![LexiconTerm {
            id: 1,
            term: "Faîtage".to_string(),
            definition: "The ridge of a roof".to_string(),
            published: true,
            deleted_at: None,
        }],
        ..ContentSnapshot::default()
    }
}
