//! Client for the external embedding model service.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::PipelineError;
use crate::types::AppConfig;

/// Turns a text segment into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text, retrying transient failures.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

/// Retry schedule for embedding requests.
///
/// The delay before retry `n` is `base_delay * 2^n`. The base is
/// injectable so tests run the loop without waiting.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,

    /// Delay unit for the exponential backoff
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the given retry (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.pow(retry.min(5))
    }
}

/// Run an embedding request under a retry policy.
///
/// Transient failures (the request erroring, or a success carrying an
/// empty vector) are retried with exponential backoff; the last error
/// surfaces once the policy is exhausted.
pub async fn embed_with_retries<F, Fut>(
    policy: &RetryPolicy,
    mut request: F,
) -> Result<Vec<f32>, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<f32>, PipelineError>>,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay(attempt - 1);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        match request().await {
            Ok(vector) if !vector.is_empty() => return Ok(vector),
            Ok(_) => {
                last_error = Some(PipelineError::Embedding(
                    "response carried an empty embedding vector".to_string(),
                ));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error
        .unwrap_or_else(|| PipelineError::Embedding("retries exhausted".to_string())))
}

/// Embedding client for the OpenAI embeddings endpoint.
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    /// Create a new embedding client from the service configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.embedding_model.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..Default::default()
            },
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One request against the embeddings endpoint, no retries.
    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "encoding_format": "float",
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Embedding(format!("unreadable response body: {}", e)))?;
        parse_embedding_response(&json)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        embed_with_retries(&self.retry, || self.request_embedding(text)).await
    }
}

/// Pull the vector out of an embeddings response body.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            PipelineError::Embedding("malformed response: missing data[0].embedding".to_string())
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn succeeds_on_the_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = embed_with_retries(&instant_policy(3), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(PipelineError::Embedding("transient".to_string()))
                } else {
                    Ok(vec![0.1, 0.2, 0.3])
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_the_last_error_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let result = embed_with_retries(&instant_policy(2), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<Vec<f32>, _>(PipelineError::Embedding(format!("failure {}", attempt)))
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failure 2"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_vector_counts_as_transient() {
        let calls = AtomicU32::new(0);
        let result = embed_with_retries(&instant_policy(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::new()) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("empty embedding vector"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parses_a_valid_response() {
        let json = serde_json::json!({
            "data": [{ "embedding": [0.5, -0.25, 0.125] }]
        });
        let vector = parse_embedding_response(&json).unwrap();
        assert_eq!(vector, vec![0.5, -0.25, 0.125]);
    }

    #[test]
    fn rejects_a_malformed_response() {
        let json = serde_json::json!({ "data": [] });
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, PipelineError::Embedding(_)));
    }
}
