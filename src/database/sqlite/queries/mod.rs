#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::content::{
    Certification, CompanyInfoField, ContentSnapshot, ContentType, FaqEntry, LexiconTerm, Project,
    Service,
};

pub struct EmbeddingQueries;

const UPSERT_EMBEDDING: &str = r#"
    INSERT INTO embeddings (content_type, content_id, content_text, embedding, dimension, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (content_type, content_id) DO UPDATE SET
        content_text = excluded.content_text,
        embedding = excluded.embedding,
        dimension = excluded.dimension,
        updated_at = excluded.updated_at
"#;

impl EmbeddingQueries {
    /// Insert or overwrite every record in a single transaction
    #[inline]
    pub async fn upsert_many(pool: &SqlitePool, records: &[EmbeddingRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin embeddings transaction")?;

        let mut written = 0;
        for record in records {
            let dimension = i64::try_from(record.dimension())
                .context("Embedding dimension does not fit in i64")?;

            written += sqlx::query(UPSERT_EMBEDDING)
                .bind(record.content_type.as_str())
                .bind(&record.content_id)
                .bind(&record.content_text)
                .bind(encode_vector(&record.embedding))
                .bind(dimension)
                .bind(record.updated_at)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!(
                        "Failed to upsert embedding {}/{}",
                        record.content_type, record.content_id
                    )
                })?
                .rows_affected();
        }

        tx.commit()
            .await
            .context("Failed to commit embeddings transaction")?;

        debug!("Upserted {} embeddings", written);
        Ok(written)
    }

    #[inline]
    pub async fn delete_by_type(pool: &SqlitePool, content_type: &ContentType) -> Result<u64> {
        let result = sqlx::query("DELETE FROM embeddings WHERE content_type = ?")
            .bind(content_type.as_str())
            .execute(pool)
            .await
            .with_context(|| format!("Failed to delete {content_type} embeddings"))?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM embeddings")
            .execute(pool)
            .await
            .context("Failed to delete all embeddings")?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn stats_by_type(pool: &SqlitePool) -> Result<Vec<EmbeddingStats>> {
        let rows = sqlx::query_as::<_, EmbeddingStatsRow>(
            r#"
            SELECT content_type,
                   COUNT(*) AS count,
                   MAX(updated_at) AS last_updated
            FROM embeddings
            GROUP BY content_type
            ORDER BY content_type
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to compute embedding statistics")?;

        rows.into_iter().map(EmbeddingStats::try_from).collect()
    }

    /// Every stored embedding, optionally restricted to one content type,
    /// in `(content_type, content_id)` order
    #[inline]
    pub async fn list(
        pool: &SqlitePool,
        content_type: Option<&ContentType>,
    ) -> Result<Vec<EmbeddingRecord>> {
        let rows = match content_type {
            Some(content_type) => {
                sqlx::query_as::<_, EmbeddingRow>(
                    r#"
                    SELECT content_type, content_id, content_text, embedding, dimension, updated_at
                    FROM embeddings
                    WHERE content_type = ?
                    ORDER BY content_type, content_id
                    "#,
                )
                .bind(content_type.as_str())
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EmbeddingRow>(
                    r#"
                    SELECT content_type, content_id, content_text, embedding, dimension, updated_at
                    FROM embeddings
                    ORDER BY content_type, content_id
                    "#,
                )
                .fetch_all(pool)
                .await
            }
        }
        .context("Failed to list embeddings")?;

        rows.into_iter().map(EmbeddingRecord::try_from).collect()
    }

    #[inline]
    pub async fn get(
        pool: &SqlitePool,
        content_type: &ContentType,
        content_id: &str,
    ) -> Result<Option<EmbeddingRecord>> {
        let row = sqlx::query_as::<_, EmbeddingRow>(
            r#"
            SELECT content_type, content_id, content_text, embedding, dimension, updated_at
            FROM embeddings
            WHERE content_type = ? AND content_id = ?
            "#,
        )
        .bind(content_type.as_str())
        .bind(content_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get embedding")?;

        row.map(EmbeddingRecord::try_from).transpose()
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(pool)
            .await
            .context("Failed to count embeddings")
    }
}

pub struct ContentQueries;

impl ContentQueries {
    #[inline]
    pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, location, category, year, published, deleted_at
            FROM projects ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list projects")
    }

    #[inline]
    pub async fn list_faq(pool: &SqlitePool) -> Result<Vec<FaqEntry>> {
        sqlx::query_as::<_, FaqEntry>(
            r#"
            SELECT id, question, answer, category, published, deleted_at
            FROM faq ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list FAQ entries")
    }

    #[inline]
    pub async fn list_lexique(pool: &SqlitePool) -> Result<Vec<LexiconTerm>> {
        sqlx::query_as::<_, LexiconTerm>(
            "SELECT id, term, definition, published, deleted_at FROM lexique ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list lexicon terms")
    }

    #[inline]
    pub async fn list_certifications(pool: &SqlitePool) -> Result<Vec<Certification>> {
        sqlx::query_as::<_, Certification>(
            r#"
            SELECT id, name, issuer, description, published, deleted_at
            FROM certifications ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list certifications")
    }

    #[inline]
    pub async fn list_services(pool: &SqlitePool) -> Result<Vec<Service>> {
        sqlx::query_as::<_, Service>(
            "SELECT id, title, description, published, deleted_at FROM services ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list services")
    }

    #[inline]
    pub async fn list_company_info(pool: &SqlitePool) -> Result<Vec<CompanyInfoField>> {
        sqlx::query_as::<_, CompanyInfoField>("SELECT key, value FROM company_info ORDER BY key")
            .fetch_all(pool)
            .await
            .context("Failed to list company info")
    }

    /// Replace the content of every domain table with the snapshot, atomically
    #[inline]
    pub async fn replace_all(pool: &SqlitePool, snapshot: &ContentSnapshot) -> Result<()> {
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin content import transaction")?;

        for table in [
            "projects",
            "faq",
            "lexique",
            "certifications",
            "services",
            "company_info",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to clear {table}"))?;
        }

        for project in &snapshot.projects {
            sqlx::query(
                r#"
                INSERT INTO projects (id, title, description, location, category, year, published, deleted_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(&project.location)
            .bind(&project.category)
            .bind(project.year)
            .bind(project.published)
            .bind(project.deleted_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert project {}", project.id))?;
        }

        for entry in &snapshot.faq {
            sqlx::query(
                r#"
                INSERT INTO faq (id, question, answer, category, published, deleted_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id)
            .bind(&entry.question)
            .bind(&entry.answer)
            .bind(&entry.category)
            .bind(entry.published)
            .bind(entry.deleted_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert FAQ entry {}", entry.id))?;
        }

        for term in &snapshot.lexique {
            sqlx::query(
                "INSERT INTO lexique (id, term, definition, published, deleted_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(term.id)
            .bind(&term.term)
            .bind(&term.definition)
            .bind(term.published)
            .bind(term.deleted_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert lexicon term {}", term.id))?;
        }

        for cert in &snapshot.certifications {
            sqlx::query(
                r#"
                INSERT INTO certifications (id, name, issuer, description, published, deleted_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(cert.id)
            .bind(&cert.name)
            .bind(&cert.issuer)
            .bind(&cert.description)
            .bind(cert.published)
            .bind(cert.deleted_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert certification {}", cert.id))?;
        }

        for service in &snapshot.services {
            sqlx::query(
                "INSERT INTO services (id, title, description, published, deleted_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(service.id)
            .bind(&service.title)
            .bind(&service.description)
            .bind(service.published)
            .bind(service.deleted_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert service {}", service.id))?;
        }

        for field in &snapshot.company_info {
            sqlx::query("INSERT INTO company_info (key, value) VALUES (?, ?)")
                .bind(&field.key)
                .bind(&field.value)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert company info {}", field.key))?;
        }

        tx.commit()
            .await
            .context("Failed to commit content import")?;

        debug!("Imported {} content records", snapshot.record_count());
        Ok(())
    }
}
