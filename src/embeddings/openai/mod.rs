
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{EmbeddingProvider, EmbeddingProviderError, endpoint, ensure_text, ensure_vector, post_json};
use crate::config::{ConfigError, EmbeddingConfig};

/// Client for OpenAI-compatible `/v1/embeddings` endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, ConfigError> {
        let endpoint = endpoint(&config.url()?, "v1/embeddings")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Embed one text on the calling thread
    #[inline]
    pub fn embed_blocking(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        ensure_text(text)?;
        debug!("Requesting embedding for text (length: {})", text.len());

        let body = serde_json::to_string(&EmbeddingRequest {
            model: &self.model,
            input: text,
        })
        .map_err(|e| EmbeddingProviderError::Request(e.to_string()))?;

        let response_text = post_json(&self.agent, &self.endpoint, &body, Some(&self.api_key))?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingProviderError::MalformedResponse(e.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                EmbeddingProviderError::MalformedResponse("response has no data".to_string())
            })?;

        let embedding = ensure_vector(embedding)?;
        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        ensure_text(text)?;

        let client = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || client.embed_blocking(&text))
            .await
            .map_err(|e| EmbeddingProviderError::Transport(format!("embedding task failed: {e}")))?
    }
}
