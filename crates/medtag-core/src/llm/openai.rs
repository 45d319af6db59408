//! OpenAI classifier using the Chat Completions API.
//!
//! Structured output uses strict `json_schema` response format with the
//! candidate labels as a string enum; images travel as data URLs in the
//! user message content array.

use super::provider::{
    candidate_instruction, retain_known_labels, CaptionRequest, CaptionResponse, ClassifyInput,
    ClassifyRequest, ClassifyResponse, TopicClassifier,
};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI classifier using Chat Completions with strict structured outputs.
pub struct OpenAiClassifier {
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiClassifier {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn complete(&self, body: &ChatRequest) -> Result<(String, String), PipelineError> {
        let resp = self
            .client
            .post(ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Llm {
                message: format!("OpenAI request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse OpenAI response: {e}"),
            status_code: None,
        })?;

        let content = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PipelineError::Llm {
                message: "OpenAI returned empty choices array".to_string(),
                status_code: None,
            })?;

        Ok((content, chat_resp.model))
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
    json_schema: JsonSchema,
}

#[derive(Serialize)]
struct JsonSchema {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

/// Strict schema constraining `keywords` to the candidate labels.
fn keywords_format(labels: &[String]) -> ResponseFormat {
    ResponseFormat {
        kind: "json_schema".to_string(),
        json_schema: JsonSchema {
            name: "topic_keywords".to_string(),
            strict: true,
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string", "enum": labels }
                    }
                },
                "required": ["keywords"],
                "additionalProperties": false
            }),
        },
    }
}

/// Strict schema for captioning: a caption plus depicted candidate labels.
fn caption_format(labels: &[String]) -> ResponseFormat {
    ResponseFormat {
        kind: "json_schema".to_string(),
        json_schema: JsonSchema {
            name: "image_caption".to_string(),
            strict: true,
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "caption": { "type": "string" },
                    "concepts": {
                        "type": "array",
                        "items": { "type": "string", "enum": labels }
                    }
                },
                "required": ["caption", "concepts"],
                "additionalProperties": false
            }),
        },
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct KeywordsPayload {
    keywords: Vec<String>,
}

#[derive(Deserialize)]
struct CaptionPayload {
    caption: String,
    concepts: Vec<String>,
}

#[async_trait]
impl TopicClassifier for OpenAiClassifier {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse, PipelineError> {
        let start = Instant::now();
        let labels: Vec<String> = request.candidates.iter().map(|c| c.label.clone()).collect();

        let user_content = match &request.input {
            ClassifyInput::Text(text) => vec![ChatContent::Text {
                text: format!("Classify this text:\n\n{text}"),
            }],
            ClassifyInput::Image(image) => vec![
                ChatContent::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
                ChatContent::Text {
                    text: "Classify this image.".to_string(),
                },
            ],
        };

        let body = ChatRequest {
            model: self.model.clone(),
            temperature: request.temperature,
            response_format: keywords_format(&labels),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: vec![ChatContent::Text {
                        text: candidate_instruction(&request.candidates),
                    }],
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
        };

        let (content, model) = self.complete(&body).await?;
        let payload: KeywordsPayload =
            serde_json::from_str(&content).map_err(|e| PipelineError::Llm {
                message: format!("OpenAI returned malformed keywords JSON: {e}"),
                status_code: None,
            })?;

        Ok(ClassifyResponse {
            keywords: retain_known_labels(payload.keywords, &request.candidates),
            model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError> {
        let labels: Vec<String> = request.candidates.iter().map(|c| c.label.clone()).collect();

        let body = ChatRequest {
            model: self.model.clone(),
            temperature: request.temperature,
            response_format: caption_format(&labels),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: vec![ChatContent::Text {
                        text: format!(
                            "{}\n\nAlso write a single-sentence caption for the image.",
                            candidate_instruction(&request.candidates)
                        ),
                    }],
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: vec![
                        ChatContent::ImageUrl {
                            image_url: ImageUrl {
                                url: request.image.data_url(),
                            },
                        },
                        ChatContent::Text {
                            text: "Caption this image and list the depicted topics.".to_string(),
                        },
                    ],
                },
            ],
        };

        let (content, model) = self.complete(&body).await?;
        let payload: CaptionPayload =
            serde_json::from_str(&content).map_err(|e| PipelineError::Llm {
                message: format!("OpenAI returned malformed caption JSON: {e}"),
                status_code: None,
            })?;

        Ok(CaptionResponse {
            caption: payload.caption.trim().to_string(),
            concepts: retain_known_labels(payload.concepts, &request.candidates),
            model,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
