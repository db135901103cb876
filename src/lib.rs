use thiserror::Error;

use crate::config::ConfigError;
use crate::embeddings::EmbeddingProviderError;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(#[from] EmbeddingProviderError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Content source error: {0}")]
    ContentSource(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Wrap an internal database failure, keeping the whole context chain
    #[inline]
    pub fn storage(error: &anyhow::Error) -> Self {
        RagError::Storage(format!("{error:#}"))
    }
}

pub mod commands;
pub mod config;
pub mod content;
pub mod database;
pub mod diagnostics;
pub mod embeddings;
pub mod indexer;
pub mod search;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
