//! Completion gateway
//!
//! Text completions via an OpenAI-compatible `/chat/completions` endpoint.
//! Only the agent pipeline calls this; the retrieval core never does.

use crate::errors::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Low temperature keeps policy answers consistent across runs.
const TEMPERATURE: f32 = 0.3;

/// Capability: prompt in, text out
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// HTTP chat-completion client for OpenAI-compatible APIs
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiCompletion {
    /// Create a new completion client
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "temperature": TEMPERATURE,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }))
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "completion API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("unreadable completion response: {}", e)))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            AgentError::Provider("completion API returned no choices".to_string())
        })?;

        Ok(choice.message.content)
    }
}
