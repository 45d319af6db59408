//! Classifier trait and request/response types.
//!
//! Defines the interface that all LLM classifiers implement, plus the
//! factory that creates the right one from CLI flags and config. Every
//! classifier receives the candidate vocabulary with each request and must
//! only return labels drawn from it; `retain_known_labels` enforces that
//! boundary on whatever the model actually sends back.

use crate::config::{LimitsConfig, LlmConfig};
use crate::error::PipelineError;
use crate::types::RankedConcept;
use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// One candidate topic as presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct VocabularyEntry {
    pub label: String,
    pub definition: String,
}

impl VocabularyEntry {
    pub fn from_ranked(ranked: &[RankedConcept]) -> Vec<Self> {
        ranked
            .iter()
            .map(|r| Self {
                label: r.label.clone(),
                definition: r.definition.clone(),
            })
            .collect()
    }
}

/// What the model is asked to look at.
#[derive(Debug, Clone)]
pub enum ClassifyInput {
    Text(String),
    Image(ImageInput),
}

/// A request to pick applicable topics from a candidate list.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    /// Text or image under classification
    pub input: ClassifyInput,
    /// Candidate vocabulary; the model may only answer with these labels
    pub candidates: Vec<VocabularyEntry>,
    /// Sampling temperature
    pub temperature: f32,
}

/// The response from a classify call.
#[derive(Debug, Clone)]
pub struct ClassifyResponse {
    /// Selected topic labels, already boundary-checked
    pub keywords: Vec<String>,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// A request to caption an image and name the topics it depicts.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: ImageInput,
    /// Candidate vocabulary; depicted topics come from these labels
    pub candidates: Vec<VocabularyEntry>,
    pub temperature: f32,
}

/// The response from a caption call.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    /// One-sentence caption
    pub caption: String,
    /// Depicted topic labels, already boundary-checked
    pub concepts: Vec<String>,
    /// Model identifier used
    pub model: String,
}

/// Trait that all topic classifiers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn TopicClassifier>` for dynamic dispatch).
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Classifier name for logging (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Select applicable topics from the request's candidate list.
    async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse, PipelineError>;

    /// Caption an image and name the depicted topics.
    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError>;

    /// Per-request timeout for this classifier.
    fn timeout(&self) -> Duration;
}

/// Shared instruction text presenting the candidate vocabulary.
pub(super) fn candidate_instruction(candidates: &[VocabularyEntry]) -> String {
    let listing = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You classify content against IPTC Media Topics. The only labels you \
         may use are listed below with their definitions. Select every label \
         that genuinely applies and nothing else.\n\nCandidate topics: {listing}"
    )
}

/// Drop labels the model returned that are not in the candidate list.
///
/// Constrained decoding makes this rare, but an out-of-vocabulary label must
/// never reach callers.
pub(super) fn retain_known_labels(
    keywords: Vec<String>,
    candidates: &[VocabularyEntry],
) -> Vec<String> {
    keywords
        .into_iter()
        .filter(|keyword| {
            let known = candidates.iter().any(|c| c.label == *keyword);
            if !known {
                tracing::warn!("Model returned unknown label '{keyword}', dropping it");
            }
            known
        })
        .collect()
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the appropriate classifier from CLI flags and config.
pub struct ClassifierFactory;

impl ClassifierFactory {
    /// Create a classifier based on provider name, config, and optional model override.
    ///
    /// # Arguments
    /// * `provider` - Provider identifier ("gemini", "openai")
    /// * `config` - The full LLM config section
    /// * `limits` - Timeout limits
    /// * `model_override` - Optional model name that overrides the config default
    pub fn create(
        provider: &str,
        config: &LlmConfig,
        limits: &LimitsConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn TopicClassifier>, PipelineError> {
        let timeout = Duration::from_millis(limits.llm_timeout_ms);
        match provider {
            "gemini" => {
                let cfg = config.gemini.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Llm {
                    message: "Gemini API key not set. Set GOOGLE_AI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::gemini::GeminiClassifier::new(
                    &api_key, &model, timeout,
                )))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Llm {
                    message: "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiClassifier::new(
                    &api_key, &model, timeout,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!("Unknown LLM provider: {other}"),
                status_code: None,
            }),
        }
    }
}
