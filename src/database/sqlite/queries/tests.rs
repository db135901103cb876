use super::*;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::migrate!("src/database/sqlite/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

fn record(content_type: ContentType, id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        content_type,
        content_id: id.to_string(),
        content_text: format!("text for {id}"),
        embedding,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let (_temp_dir, pool) = create_test_pool().await;

    let first = record(ContentType::FAQ, "1", vec![1.0, 0.0]);
    EmbeddingQueries::upsert_many(&pool, &[first.clone()])
        .await
        .expect("Failed to upsert");

    let mut second = record(ContentType::FAQ, "1", vec![0.0, 1.0]);
    second.content_text = "rewritten".to_string();
    EmbeddingQueries::upsert_many(&pool, &[second])
        .await
        .expect("Failed to upsert again");

    assert_eq!(EmbeddingQueries::count(&pool).await.expect("count"), 1);

    let stored = EmbeddingQueries::get(&pool, &ContentType::FAQ, "1")
        .await
        .expect("Failed to get")
        .expect("record should exist");
    assert_eq!(stored.content_text, "rewritten");
    assert_eq!(stored.embedding, vec![0.0, 1.0]);
}

#[tokio::test]
async fn empty_upsert_is_a_no_op() {
    let (_temp_dir, pool) = create_test_pool().await;

    let written = EmbeddingQueries::upsert_many(&pool, &[])
        .await
        .expect("Failed to upsert");
    assert_eq!(written, 0);
}

#[tokio::test]
async fn same_id_in_different_types_is_distinct() {
    let (_temp_dir, pool) = create_test_pool().await;

    EmbeddingQueries::upsert_many(
        &pool,
        &[
            record(ContentType::PROJECT, "7", vec![1.0]),
            record(ContentType::FAQ, "7", vec![0.5]),
        ],
    )
    .await
    .expect("Failed to upsert");

    assert_eq!(EmbeddingQueries::count(&pool).await.expect("count"), 2);
}

#[tokio::test]
async fn delete_by_type_leaves_other_types() {
    let (_temp_dir, pool) = create_test_pool().await;

    EmbeddingQueries::upsert_many(
        &pool,
        &[
            record(ContentType::PROJECT, "1", vec![1.0]),
            record(ContentType::PROJECT, "2", vec![1.0]),
            record(ContentType::FAQ, "1", vec![1.0]),
        ],
    )
    .await
    .expect("Failed to upsert");

    let deleted = EmbeddingQueries::delete_by_type(&pool, &ContentType::PROJECT)
        .await
        .expect("Failed to delete");
    assert_eq!(deleted, 2);

    let remaining = EmbeddingQueries::list(&pool, None)
        .await
        .expect("Failed to list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content_type, ContentType::FAQ);

    let deleted = EmbeddingQueries::delete_by_type(&pool, &ContentType::SERVICE)
        .await
        .expect("Deleting an absent type should succeed");
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn delete_all_empties_the_table() {
    let (_temp_dir, pool) = create_test_pool().await;

    EmbeddingQueries::upsert_many(
        &pool,
        &[
            record(ContentType::PROJECT, "1", vec![1.0]),
            record(ContentType::LEXIQUE, "1", vec![1.0]),
        ],
    )
    .await
    .expect("Failed to upsert");

    assert_eq!(EmbeddingQueries::delete_all(&pool).await.expect("delete"), 2);
    assert_eq!(EmbeddingQueries::count(&pool).await.expect("count"), 0);
}

#[tokio::test]
async fn stats_group_by_type() {
    let (_temp_dir, pool) = create_test_pool().await;

    let older = Utc::now() - Duration::hours(2);
    let newer = Utc::now();

    let mut a = record(ContentType::PROJECT, "1", vec![1.0]);
    a.updated_at = older;
    let mut b = record(ContentType::PROJECT, "2", vec![1.0]);
    b.updated_at = newer;
    let c = record(ContentType::FAQ, "1", vec![1.0]);

    EmbeddingQueries::upsert_many(&pool, &[a, b, c])
        .await
        .expect("Failed to upsert");

    let stats = EmbeddingQueries::stats_by_type(&pool)
        .await
        .expect("Failed to get stats");

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].content_type, ContentType::FAQ);
    assert_eq!(stats[0].count, 1);
    assert_eq!(stats[1].content_type, ContentType::PROJECT);
    assert_eq!(stats[1].count, 2);

    let last_updated = stats[1].last_updated.expect("should have a timestamp");
    assert!((last_updated - newer).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn stats_on_empty_store() {
    let (_temp_dir, pool) = create_test_pool().await;

    let stats = EmbeddingQueries::stats_by_type(&pool)
        .await
        .expect("Failed to get stats");
    assert!(stats.is_empty());
}

#[tokio::test]
async fn list_filters_by_type() {
    let (_temp_dir, pool) = create_test_pool().await;

    EmbeddingQueries::upsert_many(
        &pool,
        &[
            record(ContentType::SERVICE, "b", vec![1.0, 2.0]),
            record(ContentType::SERVICE, "a", vec![3.0, 4.0]),
            record(ContentType::FAQ, "z", vec![5.0, 6.0]),
        ],
    )
    .await
    .expect("Failed to upsert");

    let services = EmbeddingQueries::list(&pool, Some(&ContentType::SERVICE))
        .await
        .expect("Failed to list");
    let ids: Vec<&str> = services.iter().map(|r| r.content_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(services[0].embedding, vec![3.0, 4.0]);
}

fn snapshot() -> ContentSnapshot {
    ContentSnapshot {
        projects: vec![Project {
            id: 1,
            title: "Chalet des Aravis".to_string(),
            description: Some("Timber frame renovation".to_string()),
            location: Some("La Clusaz".to_string()),
            category: None,
            year: Some(2021),
            published: true,
            deleted_at: None,
        }],
        faq: vec![FaqEntry {
            id: 3,
            question: "Do you work in winter?".to_string(),
            answer: "Yes.".to_string(),
            category: None,
            published: false,
            deleted_at: None,
        }],
        lexique: vec![LexiconTerm {
            id: 9,
            term: "Faîtage".to_string(),
            definition: "Ridge of a roof".to_string(),
            published: true,
            deleted_at: Some(Utc::now()),
        }],
        certifications: vec![],
        services: vec![Service {
            id: 2,
            title: "Roofing".to_string(),
            description: None,
            published: true,
            deleted_at: None,
        }],
        company_info: vec![CompanyInfoField {
            key: "phone".to_string(),
            value: "04 50 00 00 00".to_string(),
        }],
    }
}

#[tokio::test]
async fn content_round_trips_through_tables() {
    let (_temp_dir, pool) = create_test_pool().await;
    let snapshot = snapshot();

    ContentQueries::replace_all(&pool, &snapshot)
        .await
        .expect("Failed to import");

    let projects = ContentQueries::list_projects(&pool).await.expect("projects");
    assert_eq!(projects, snapshot.projects);

    let faq = ContentQueries::list_faq(&pool).await.expect("faq");
    assert!(!faq[0].published);

    let lexique = ContentQueries::list_lexique(&pool).await.expect("lexique");
    assert!(lexique[0].deleted_at.is_some());

    assert!(
        ContentQueries::list_certifications(&pool)
            .await
            .expect("certifications")
            .is_empty()
    );
    assert_eq!(
        ContentQueries::list_services(&pool).await.expect("services"),
        snapshot.services
    );
    assert_eq!(
        ContentQueries::list_company_info(&pool)
            .await
            .expect("company info"),
        snapshot.company_info
    );
}

#[tokio::test]
async fn replace_all_discards_previous_content() {
    let (_temp_dir, pool) = create_test_pool().await;

    ContentQueries::replace_all(&pool, &snapshot())
        .await
        .expect("Failed to import");
    ContentQueries::replace_all(&pool, &ContentSnapshot::default())
        .await
        .expect("Failed to import empty snapshot");

    assert!(ContentQueries::list_projects(&pool).await.expect("projects").is_empty());
    assert!(
        ContentQueries::list_company_info(&pool)
            .await
            .expect("company info")
            .is_empty()
    );
}
