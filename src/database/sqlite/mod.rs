use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::RagError;
use crate::content::{
    Certification, CompanyInfoField, ContentSnapshot, ContentSource, ContentType, FaqEntry,
    LexiconTerm, Project, Service,
};
use crate::database::sqlite::models::{EmbeddingRecord, EmbeddingStats};
use crate::database::sqlite::queries::{ContentQueries, EmbeddingQueries};

#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

pub const DATABASE_FILE_NAME: &str = "content.db";

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join(DATABASE_FILE_NAME)).await
    }

    // Embedding operations
    #[inline]
    pub async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> Result<u64> {
        EmbeddingQueries::upsert_many(&self.pool, records).await
    }

    #[inline]
    pub async fn delete_embeddings_by_type(&self, content_type: &ContentType) -> Result<u64> {
        EmbeddingQueries::delete_by_type(&self.pool, content_type).await
    }

    #[inline]
    pub async fn delete_all_embeddings(&self) -> Result<u64> {
        EmbeddingQueries::delete_all(&self.pool).await
    }

    #[inline]
    pub async fn embedding_stats(&self) -> Result<Vec<EmbeddingStats>> {
        EmbeddingQueries::stats_by_type(&self.pool).await
    }

    #[inline]
    pub async fn list_embeddings(
        &self,
        content_type: Option<&ContentType>,
    ) -> Result<Vec<EmbeddingRecord>> {
        EmbeddingQueries::list(&self.pool, content_type).await
    }

    #[inline]
    pub async fn get_embedding(
        &self,
        content_type: &ContentType,
        content_id: &str,
    ) -> Result<Option<EmbeddingRecord>> {
        EmbeddingQueries::get(&self.pool, content_type, content_id).await
    }

    #[inline]
    pub async fn count_embeddings(&self) -> Result<i64> {
        EmbeddingQueries::count(&self.pool).await
    }

    // Site content operations
    #[inline]
    pub async fn import_content(&self, snapshot: &ContentSnapshot) -> Result<()> {
        info!(
            "Importing {} content records into the database",
            snapshot.record_count()
        );
        ContentQueries::replace_all(&self.pool, snapshot).await
    }
}

fn source_error(error: &anyhow::Error) -> RagError {
    RagError::ContentSource(format!("{error:#}"))
}

#[async_trait]
impl ContentSource for Database {
    async fn projects(&self) -> crate::Result<Vec<Project>> {
        ContentQueries::list_projects(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }

    async fn faq_entries(&self) -> crate::Result<Vec<FaqEntry>> {
        ContentQueries::list_faq(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }

    async fn lexicon_terms(&self) -> crate::Result<Vec<LexiconTerm>> {
        ContentQueries::list_lexique(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }

    async fn certifications(&self) -> crate::Result<Vec<Certification>> {
        ContentQueries::list_certifications(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }

    async fn services(&self) -> crate::Result<Vec<Service>> {
        ContentQueries::list_services(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }

    async fn company_info(&self) -> crate::Result<Vec<CompanyInfoField>> {
        ContentQueries::list_company_info(&self.pool)
            .await
            .map_err(|e| source_error(&e))
    }
}
