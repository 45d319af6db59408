//! Text embedding clients for the concept index.
//!
//! The embedding engine is an external service reached over HTTP; failures
//! surface as `IndexUnavailable` and are never retried here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, LimitsConfig};
use crate::error::PipelineError;
use crate::llm::provider::resolve_env_var;

/// Trait implemented by all embedding backends.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the index holds a `Box<dyn TextEmbedder>`).
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Backend name for logging (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

fn unavailable(message: String, status_code: Option<u16>) -> PipelineError {
    PipelineError::IndexUnavailable {
        message,
        status_code,
    }
}

// ── Ollama ──

/// Ollama embedding client (`/api/embed`, batched).
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl TextEmbedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = OllamaEmbedRequest {
            model: &self.model,
            input: texts,
        };

        let resp = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unavailable(format!("Ollama embed request failed: {e}"), None))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(unavailable(
                format!("Ollama embed HTTP {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        let parsed: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse Ollama embed response: {e}"), None))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(unavailable(
                format!(
                    "Ollama returned {} embeddings for {} inputs",
                    parsed.embeddings.len(),
                    texts.len()
                ),
                None,
            ));
        }

        Ok(parsed.embeddings)
    }
}

// ── OpenAI ──

/// OpenAI embedding client (`/v1/embeddings`, batched).
pub struct OpenAiEmbedder {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = OpenAiEmbedRequest {
            model: &self.model,
            input: texts,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unavailable(format!("OpenAI embed request failed: {e}"), None))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(unavailable(
                format!("OpenAI embed HTTP {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        let parsed: OpenAiEmbedResponse = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse OpenAI embed response: {e}"), None))?;

        if parsed.data.len() != texts.len() {
            return Err(unavailable(
                format!(
                    "OpenAI returned {} embeddings for {} inputs",
                    parsed.data.len(),
                    texts.len()
                ),
                None,
            ));
        }

        // The API documents order-preservation but also carries indices;
        // honor the indices.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// ── Factory ──

/// Factory that creates the configured embedding backend.
pub struct TextEmbedderFactory;

impl TextEmbedderFactory {
    pub fn create(
        config: &EmbeddingConfig,
        limits: &LimitsConfig,
    ) -> Result<Box<dyn TextEmbedder>, PipelineError> {
        let timeout = Duration::from_millis(limits.embed_timeout_ms);
        match config.provider.as_str() {
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                Ok(Box::new(OllamaEmbedder::new(&cfg.endpoint, &cfg.model, timeout)))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    PipelineError::IndexUnavailable {
                        message: "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
                        status_code: None,
                    }
                })?;
                Ok(Box::new(OpenAiEmbedder::new(&api_key, &cfg.model, timeout)))
            }
            other => Err(PipelineError::IndexUnavailable {
                message: format!("Unknown embedding provider: {other}"),
                status_code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_default_is_ollama() {
        let embedder =
            TextEmbedderFactory::create(&EmbeddingConfig::default(), &LimitsConfig::default())
                .unwrap();
        assert_eq!(embedder.name(), "ollama");
    }

    #[test]
    fn test_factory_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        let err = TextEmbedderFactory::create(&config, &LimitsConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_ollama_request_body_shape() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let body = OllamaEmbedRequest {
            model: "nomic-embed-text",
            input: &texts,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"model":"nomic-embed-text","input":["a","b"]}"#);
    }

    #[test]
    fn test_openai_response_respects_indices() {
        let json = r#"{"data":[{"index":1,"embedding":[2.0]},{"index":0,"embedding":[1.0]}]}"#;
        let parsed: OpenAiEmbedResponse = serde_json::from_str(json).unwrap();
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        assert_eq!(data[0].embedding, vec![1.0]);
        assert_eq!(data[1].embedding, vec![2.0]);
    }
}
