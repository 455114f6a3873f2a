//! Embedding client for OpenAI-compatible endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Computes embedding vectors for passages and questions.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text fragment.
    async fn embed(&self, input: &str) -> Result<Vec<f32>>;
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
}

impl OpenAiEmbedder {
    /// Build a new embeddings client.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("missing embeddings API key".into()));
        }
        if model.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("missing embeddings model".into()));
        }
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimensions: None,
            max_retries: 3,
        })
    }

    /// Request reduced-dimension vectors.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Set the retry budget for rate limits and server errors.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: [input],
                dimensions: self.dimensions,
            };
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await?;
                        let vector = parsed
                            .data
                            .into_iter()
                            .next()
                            .map(|entry| entry.embedding)
                            .ok_or_else(|| ProviderError::UnexpectedPayload {
                                service: "embeddings",
                                detail: "empty data array".into(),
                            })?;
                        return Ok(vector);
                    }

                    let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".into());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(ProviderError::Api {
                        service: "embeddings",
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    if retryable && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_api_key() {
        let err = OpenAiEmbedder::new(
            reqwest::Client::new(),
            "https://api.openai.com/v1",
            "  ",
            "text-embedding-3-small",
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(OpenAiEmbedder::retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(OpenAiEmbedder::retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(
            OpenAiEmbedder::retry_backoff(20),
            OpenAiEmbedder::retry_backoff(5)
        );
    }
}
