use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        base_url: "http://test-host:1234".to_string(),
        model: "nomic-embed-text".to_string(),
        ..EmbeddingConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "nomic-embed-text");
    assert_eq!(client.endpoint.host_str(), Some("test-host"));
    assert_eq!(client.endpoint.port(), Some(1234));
    assert_eq!(client.endpoint.path(), "/api/embed");
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&EmbeddingConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60));

    assert_eq!(client.model(), "text-embedding-3-small");
}

#[tokio::test]
async fn embed_takes_first_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text",
            "input": "Timber frame extension"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = EmbeddingConfig {
        base_url: server.uri(),
        model: "nomic-embed-text".to_string(),
        ..EmbeddingConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    let vector = client
        .embed("Timber frame extension")
        .await
        .expect("embedding should succeed");
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn empty_vector_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[]] })),
        )
        .mount(&server)
        .await;

    let config = EmbeddingConfig {
        base_url: server.uri(),
        ..EmbeddingConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert!(matches!(
        client.embed("text").await,
        Err(EmbeddingProviderError::MalformedResponse(_))
    ));
}
