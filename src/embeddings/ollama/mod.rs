#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{EmbeddingProvider, EmbeddingProviderError, endpoint, ensure_text, ensure_vector, post_json};
use crate::config::{ConfigError, EmbeddingConfig};

/// Client for a local Ollama server's `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let endpoint = endpoint(&config.url()?, "api/embed")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
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
        debug!("Generating embedding for text (length: {})", text.len());

        let body = serde_json::to_string(&EmbedRequest {
            model: &self.model,
            input: text,
        })
        .map_err(|e| EmbeddingProviderError::Request(e.to_string()))?;

        let response_text = post_json(&self.agent, &self.endpoint, &body, None)?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingProviderError::MalformedResponse(e.to_string()))?;

        let embedding = response.embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingProviderError::MalformedResponse("response has no embeddings".to_string())
        })?;

        let embedding = ensure_vector(embedding)?;
        debug!(
            "Generated embedding with {} dimensions",
            embedding.len()
        );
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
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
