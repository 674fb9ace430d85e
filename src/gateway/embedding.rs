//! Embedding gateway
//!
//! Maps text to fixed-dimension vectors via an OpenAI-compatible
//! `/embeddings` endpoint. The core attempts each request exactly once;
//! retries are the provider's concern, not ours.

use crate::errors::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Capability: text in, fixed-length vector out
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts in one request
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension this provider produces
    fn dimension(&self) -> usize;
}

/// HTTP embedding client for OpenAI-compatible APIs
pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    /// Create a new embedding client
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
            timeout,
        })
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": inputs,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::EmbeddingTimeout {
                        duration_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AgentError::Provider(format!("embedding request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "embedding API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("unreadable embedding response: {}", e)))?;

        if parsed.data.len() != inputs.len() {
            return Err(AgentError::Provider(format!(
                "embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);

        for row in &rows {
            if row.embedding.len() != self.dimension {
                return Err(AgentError::Provider(format!(
                    "embedding API returned dimension {} but {} was configured",
                    row.embedding.len(),
                    self.dimension
                )));
            }
        }

        Ok(rows.into_iter().map(|r| r.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text]).await?;
        vectors.pop().ok_or_else(|| {
            AgentError::Provider("embedding API returned an empty batch".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
