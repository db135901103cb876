
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::content::ContentType;

/// The durable unit of the embedding store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub content_type: ContentType,
    pub content_id: String,
    /// The exact text that was embedded
    pub content_text: String,
    pub embedding: Vec<f32>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `embeddings` row before the vector blob is decoded
#[derive(Debug, Clone, FromRow)]
pub struct EmbeddingRow {
    pub content_type: String,
    pub content_id: String,
    pub content_text: String,
    pub embedding: Vec<u8>,
    pub dimension: i64,
    pub updated_at: DateTime<Utc>,
}

/// Indexing freshness of one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingStats {
    pub content_type: ContentType,
    pub count: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmbeddingStatsRow {
    pub content_type: String,
    pub count: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl EmbeddingRecord {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

impl TryFrom<EmbeddingRow> for EmbeddingRecord {
    type Error = anyhow::Error;

    fn try_from(row: EmbeddingRow) -> Result<Self> {
        let dimension = usize::try_from(row.dimension)
            .map_err(|_| anyhow!("negative dimension {} in embeddings row", row.dimension))?;
        let embedding = decode_vector(&row.embedding, dimension)?;
        let content_type = row
            .content_type
            .parse()
            .map_err(|e| anyhow!("invalid content_type in embeddings row: {e}"))?;

        Ok(Self {
            content_type,
            content_id: row.content_id,
            content_text: row.content_text,
            embedding,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<EmbeddingStatsRow> for EmbeddingStats {
    type Error = anyhow::Error;

    fn try_from(row: EmbeddingStatsRow) -> Result<Self> {
        let content_type = row
            .content_type
            .parse()
            .map_err(|e| anyhow!("invalid content_type in embeddings row: {e}"))?;

        Ok(Self {
            content_type,
            count: row.count,
            last_updated: row.last_updated,
        })
    }
}

/// Serialize a vector as little-endian `f32` bytes
#[inline]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a blob written by [`encode_vector`], checking its length and values
#[inline]
pub fn decode_vector(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    let expected_len = dimension
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| anyhow!("embedding dimension {dimension} overflows"))?;

    if blob.len() != expected_len {
        bail!(
            "embedding blob is {} bytes, expected {} for dimension {}",
            blob.len(),
            expected_len,
            dimension
        );
    }

    let mut vector = Vec::with_capacity(dimension);
    for chunk in blob.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            bail!("embedding contains non-finite values");
        }
        vector.push(value);
    }
    Ok(vector)
}
