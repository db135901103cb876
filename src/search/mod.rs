// Similarity search
// Embeds a live query and ranks stored embeddings against it


use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use crate::content::ContentType;
use crate::embeddings::EmbeddingProvider;
use crate::store::EmbeddingStore;
use crate::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub content_type: ContentType,
    pub content_id: String,
    pub content_text: String,
    /// Cosine similarity in `[-1, 1]`
    pub similarity: f32,
}

/// Cosine similarity of two vectors.
///
/// `None` when the lengths differ or either vector has zero magnitude.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Some(similarity as f32)
}

/// Best-first ordering; ties broken by content type then content id
fn by_rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.content_type.cmp(&b.content_type))
        .then_with(|| a.content_id.cmp(&b.content_id))
}

/// Keep candidates at or above `threshold`, best first, at most `limit`
#[inline]
pub fn rank_matches<I>(candidates: I, threshold: f32, limit: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = SearchResult>,
{
    let mut matches: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|candidate| candidate.similarity >= threshold)
        .collect();

    matches.sort_by(by_rank);
    matches.truncate(limit);
    matches
}

/// Check search parameters before any I/O happens
#[inline]
pub fn validate_query(query: &str, threshold: f32, max_results: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RagError::InvalidQuery("query cannot be empty".to_string()));
    }
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(RagError::InvalidQuery(format!(
            "threshold {threshold} must be between -1.0 and 1.0"
        )));
    }
    if max_results == 0 {
        return Err(RagError::InvalidQuery(
            "max_results must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn EmbeddingStore>,
}

impl SearchEngine {
    #[inline]
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn EmbeddingStore>) -> Self {
        Self { provider, store }
    }

    /// Find the stored content most similar to `query`.
    ///
    /// An empty result means nothing cleared the threshold; provider and store
    /// failures are returned as errors.
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        threshold: f32,
        max_results: usize,
        content_type: Option<&ContentType>,
    ) -> Result<Vec<SearchResult>> {
        validate_query(query, threshold, max_results)?;

        let query_vector = self.embed_query(query).await?;
        let results = self
            .match_vector(&query_vector, threshold, max_results, content_type)
            .await?;

        info!(
            "Search returned {} results (threshold {}, filter {})",
            results.len(),
            threshold,
            content_type.map_or("none", ContentType::as_str)
        );
        Ok(results)
    }

    /// Embed a query without searching; callers must validate it first
    #[inline]
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        debug!(
            "Embedding query with {} (length: {})",
            self.provider.model(),
            query.len()
        );
        Ok(self.provider.embed(query).await?)
    }

    /// Rank stored content against an already embedded query
    #[inline]
    pub async fn match_vector(
        &self,
        query_vector: &[f32],
        threshold: f32,
        max_results: usize,
        content_type: Option<&ContentType>,
    ) -> Result<Vec<SearchResult>> {
        self.store
            .match_embeddings(query_vector, threshold, max_results, content_type)
            .await
    }
}
