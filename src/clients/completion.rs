//! Client for the external chat-completion model service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::PipelineError;
use crate::types::AppConfig;

/// Sampling temperature for answer generation.
const TEMPERATURE: f32 = 0.7;

/// Token cap for a generated answer.
const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Generates an answer from a system instruction and a user message.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, PipelineError>;
}

/// Completion client for the OpenAI chat-completions endpoint.
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletion {
    /// Create a new completion client from the service configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_message },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Completion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Completion(format!(
                "completion service returned {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Completion(format!("unreadable response body: {}", e)))?;
        parse_completion_response(&json)
    }
}

/// Pull the generated message out of a chat-completions response body.
fn parse_completion_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::Completion(
                "malformed response: missing choices[0].message.content".to_string(),
            )
        })
}
