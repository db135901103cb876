use super::*;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use tempfile::TempDir;

async fn create_test_database() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let database = Database::initialize_from_config_dir(temp_dir.path()).await?;
    Ok((temp_dir, database))
}

#[tokio::test]
async fn integration_schema_migration() -> Result<()> {
    let (temp_dir, database) = create_test_database().await?;

    assert!(temp_dir.path().join(DATABASE_FILE_NAME).exists());

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
    )
    .fetch_all(database.pool())
    .await?;

    let expected_tables: HashSet<&'static str> = [
        "embeddings",
        "projects",
        "faq",
        "lexique",
        "certifications",
        "services",
        "company_info",
    ]
    .into_iter()
    .collect();

    let actual_tables: HashSet<&str> = tables.iter().map(|t| t.as_str()).collect();
    assert_eq!(actual_tables, expected_tables);

    Ok(())
}

#[tokio::test]
async fn reopening_keeps_data() -> Result<()> {
    let temp_dir = TempDir::new()?;

    {
        let database = Database::initialize_from_config_dir(temp_dir.path()).await?;
        database
            .upsert_embeddings(&[EmbeddingRecord {
                content_type: ContentType::SERVICE,
                content_id: "1".to_string(),
                content_text: "Service: Roofing".to_string(),
                embedding: vec![0.25, 0.75],
                updated_at: Utc::now(),
            }])
            .await?;
        database.pool().close().await;
    }

    let database = Database::initialize_from_config_dir(temp_dir.path()).await?;
    assert_eq!(database.count_embeddings().await?, 1);

    let stored = database
        .get_embedding(&ContentType::SERVICE, "1")
        .await?
        .expect("record should survive reopening");
    assert_eq!(stored.embedding, vec![0.25, 0.75]);

    Ok(())
}

#[tokio::test]
async fn database_is_a_content_source() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let snapshot = ContentSnapshot {
        faq: vec![FaqEntry {
            id: 1,
            question: "Q?".to_string(),
            answer: "A.".to_string(),
            category: None,
            published: true,
            deleted_at: None,
        }],
        company_info: vec![CompanyInfoField {
            key: "email".to_string(),
            value: "contact@example.com".to_string(),
        }],
        ..ContentSnapshot::default()
    };
    database.import_content(&snapshot).await?;

    let source: &dyn ContentSource = &database;
    assert_eq!(source.faq_entries().await?, snapshot.faq);
    assert_eq!(source.company_info().await?, snapshot.company_info);
    assert!(source.projects().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn source_errors_are_content_source_errors() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;
    sqlx::query("DROP TABLE projects")
        .execute(database.pool())
        .await?;

    let result = database.projects().await;
    assert!(matches!(result, Err(RagError::ContentSource(_))));

    Ok(())
}
