// Embeddings module
// Provider adapters turning a piece of text into a fixed-length vector

pub mod ollama;
pub mod openai;


use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{Config, ConfigError, ProviderKind};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Failure of a single embedding call.
///
/// Adapters never retry; [`EmbeddingProviderError::is_retryable`] tells the
/// caller which failures are worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingProviderError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("authentication rejected by provider (HTTP {0})")]
    Auth(u16),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl EmbeddingProviderError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match *self {
            EmbeddingProviderError::RateLimited | EmbeddingProviderError::Transport(_) => true,
            EmbeddingProviderError::Status(status) => status >= 500,
            EmbeddingProviderError::EmptyInput
            | EmbeddingProviderError::Auth(_)
            | EmbeddingProviderError::Request(_)
            | EmbeddingProviderError::MalformedResponse(_) => false,
        }
    }

    /// Failures that will repeat for every input, not just the current one
    #[inline]
    pub fn is_provider_wide(&self) -> bool {
        matches!(*self, EmbeddingProviderError::Auth(_))
    }
}

impl From<ureq::Error> for EmbeddingProviderError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status @ (401 | 403)) => EmbeddingProviderError::Auth(status),
            ureq::Error::StatusCode(429) => EmbeddingProviderError::RateLimited,
            ureq::Error::StatusCode(status) => EmbeddingProviderError::Status(status),
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => EmbeddingProviderError::Transport(error.to_string()),
            other => EmbeddingProviderError::Request(other.to_string()),
        }
    }
}

/// A text-embedding model
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name, for logging
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError>;
}

/// Build the provider selected in the configuration.
///
/// Fails fast when the provider needs an API key that is not set.
#[inline]
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    config.embedding.validate()?;

    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .api_key()?
                .ok_or_else(|| ConfigError::MissingCredential(config.embedding.api_key_env.clone()))?;
            Arc::new(OpenAiClient::new(&config.embedding, api_key)?)
        }
        ProviderKind::Ollama => Arc::new(OllamaClient::new(&config.embedding)?),
    };

    debug!(
        "Using {} embedding provider with model {}",
        config.embedding.provider,
        provider.model()
    );
    Ok(provider)
}

/// Join an API path onto a base URL without dropping any path prefix the base carries
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|_| ConfigError::InvalidUrl(format!("{base}{path}")))
}

/// POST a JSON body and return the response text
pub(crate) fn post_json(
    agent: &ureq::Agent,
    url: &Url,
    body: &str,
    bearer: Option<&str>,
) -> Result<String, EmbeddingProviderError> {
    let mut request = agent
        .post(url.as_str())
        .header("Content-Type", "application/json");

    if let Some(token) = bearer {
        let value = format!("Bearer {token}");
        request = request.header("Authorization", value.as_str());
    }

    let mut response = request.send(body)?;
    let text = response.body_mut().read_to_string()?;
    Ok(text)
}

/// Reject blank input before any network I/O
pub(crate) fn ensure_text(text: &str) -> Result<(), EmbeddingProviderError> {
    if text.trim().is_empty() {
        return Err(EmbeddingProviderError::EmptyInput);
    }
    Ok(())
}

/// Reject empty or non-finite vectors coming back from a provider
pub(crate) fn ensure_vector(vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingProviderError> {
    if vector.is_empty() {
        return Err(EmbeddingProviderError::MalformedResponse(
            "embedding vector is empty".to_string(),
        ));
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(EmbeddingProviderError::MalformedResponse(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(vector)
}
