// Embedding store
// The durable table of embeddings, keyed by (content_type, content_id)


use async_trait::async_trait;
use tracing::debug;

use crate::content::ContentType;
use crate::database::Database;
use crate::search::{SearchResult, cosine_similarity, rank_matches};
use crate::{RagError, Result};

pub use crate::database::models::{EmbeddingRecord, EmbeddingStats};

/// Persistence seam between the indexer/search engine and the database
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Insert or overwrite records atomically; the later write wins per key
    async fn upsert_many(&self, records: &[EmbeddingRecord]) -> Result<u64>;

    async fn delete_by_type(&self, content_type: &ContentType) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;

    async fn stats_by_type(&self) -> Result<Vec<EmbeddingStats>>;

    /// Rank stored embeddings against `query_vector`.
    ///
    /// Only matches with `similarity >= threshold` are returned, best first,
    /// at most `limit` of them.
    async fn match_embeddings(
        &self,
        query_vector: &[f32],
        threshold: f32,
        limit: usize,
        filter: Option<&ContentType>,
    ) -> Result<Vec<SearchResult>>;

    async fn count(&self) -> Result<i64>;
}

#[async_trait]
impl EmbeddingStore for Database {
    async fn upsert_many(&self, records: &[EmbeddingRecord]) -> Result<u64> {
        self.upsert_embeddings(records)
            .await
            .map_err(|e| RagError::storage(&e))
    }

    async fn delete_by_type(&self, content_type: &ContentType) -> Result<u64> {
        self.delete_embeddings_by_type(content_type)
            .await
            .map_err(|e| RagError::storage(&e))
    }

    async fn delete_all(&self) -> Result<u64> {
        self.delete_all_embeddings()
            .await
            .map_err(|e| RagError::storage(&e))
    }

    async fn stats_by_type(&self) -> Result<Vec<EmbeddingStats>> {
        self.embedding_stats()
            .await
            .map_err(|e| RagError::storage(&e))
    }

    async fn match_embeddings(
        &self,
        query_vector: &[f32],
        threshold: f32,
        limit: usize,
        filter: Option<&ContentType>,
    ) -> Result<Vec<SearchResult>> {
        let records = self
            .list_embeddings(filter)
            .await
            .map_err(|e| RagError::storage(&e))?;
        let scanned = records.len();

        let candidates = records.into_iter().filter_map(|record| {
            // Rows of another dimension (a model switch without a reindex) never match
            let similarity = cosine_similarity(query_vector, &record.embedding)?;
            Some(SearchResult {
                content_type: record.content_type,
                content_id: record.content_id,
                content_text: record.content_text,
                similarity,
            })
        });

        let matches = rank_matches(candidates, threshold, limit);
        debug!(
            "Matched {} of {} stored embeddings at threshold {}",
            matches.len(),
            scanned,
            threshold
        );
        Ok(matches)
    }

    async fn count(&self) -> Result<i64> {
        self.count_embeddings()
            .await
            .map_err(|e| RagError::storage(&e))
    }
}
