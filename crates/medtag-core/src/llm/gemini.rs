//! Gemini classifier using the generateContent API.
//!
//! Structured output is enforced with a response schema whose `keywords`
//! items carry an enum of the candidate labels, so the model decodes only
//! labels we offered it. Thinking is disabled; classification over a fixed
//! candidate list does not benefit from it.

use super::provider::{
    candidate_instruction, retain_known_labels, CaptionRequest, CaptionResponse, ClassifyInput,
    ClassifyRequest, ClassifyResponse, TopicClassifier,
};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini classifier using generateContent with a constrained response schema.
pub struct GeminiClassifier {
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GeminiClassifier {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn generate(&self, body: &GenerateRequest) -> Result<String, PipelineError> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Llm {
                message: format!("Gemini request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("Gemini HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let generated: GenerateResponse = resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse Gemini response: {e}"),
            status_code: None,
        })?;

        generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| PipelineError::Llm {
                message: "Gemini returned no candidates".to_string(),
                status_code: None,
            })
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateRequest {
    system_instruction: Instruction,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
    #[serde(rename = "thinkingConfig")]
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
struct ThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: u32,
}

/// Schema constraining `keywords` to the candidate labels.
fn keywords_schema(labels: &[String]) -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "keywords": {
                "type": "ARRAY",
                "items": { "type": "STRING", "enum": labels }
            }
        },
        "required": ["keywords"]
    })
}

/// Schema for captioning: a caption plus the depicted candidate labels.
fn caption_schema(labels: &[String]) -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "caption": { "type": "STRING" },
            "concepts": {
                "type": "ARRAY",
                "items": { "type": "STRING", "enum": labels }
            }
        },
        "required": ["caption", "concepts"]
    })
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
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
impl TopicClassifier for GeminiClassifier {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse, PipelineError> {
        let start = Instant::now();
        let labels: Vec<String> = request.candidates.iter().map(|c| c.label.clone()).collect();

        let user_parts = match &request.input {
            ClassifyInput::Text(text) => vec![Part::Text {
                text: format!("Classify this text:\n\n{text}"),
            }],
            ClassifyInput::Image(image) => vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.media_type.clone(),
                        data: image.data.clone(),
                    },
                },
                Part::Text {
                    text: "Classify this image.".to_string(),
                },
            ],
        };

        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: vec![Part::Text {
                    text: candidate_instruction(&request.candidates),
                }],
            },
            contents: vec![Content { parts: user_parts }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json".to_string(),
                response_schema: keywords_schema(&labels),
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let text = self.generate(&body).await?;
        let payload: KeywordsPayload =
            serde_json::from_str(&text).map_err(|e| PipelineError::Llm {
                message: format!("Gemini returned malformed keywords JSON: {e}"),
                status_code: None,
            })?;

        Ok(ClassifyResponse {
            keywords: retain_known_labels(payload.keywords, &request.candidates),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError> {
        let labels: Vec<String> = request.candidates.iter().map(|c| c.label.clone()).collect();

        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: vec![Part::Text {
                    text: format!(
                        "{}\n\nAlso write a single-sentence caption for the image.",
                        candidate_instruction(&request.candidates)
                    ),
                }],
            },
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    Part::Text {
                        text: "Caption this image and list the depicted topics.".to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json".to_string(),
                response_schema: caption_schema(&labels),
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let text = self.generate(&body).await?;
        let payload: CaptionPayload =
            serde_json::from_str(&text).map_err(|e| PipelineError::Llm {
                message: format!("Gemini returned malformed caption JSON: {e}"),
                status_code: None,
            })?;

        Ok(CaptionResponse {
            caption: payload.caption.trim().to_string(),
            concepts: retain_known_labels(payload.concepts, &request.candidates),
            model: self.model.clone(),
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_schema_carries_enum() {
        let schema = keywords_schema(&["flood".to_string(), "environment".to_string()]);
        let items = &schema["properties"]["keywords"]["items"];
        assert_eq!(items["enum"][0], "flood");
        assert_eq!(items["enum"][1], "environment");
    }

    #[test]
    fn test_caption_schema_requires_both_fields() {
        let schema = caption_schema(&["flood".to_string()]);
        assert_eq!(schema["required"][0], "caption");
        assert_eq!(schema["required"][1], "concepts");
    }

    #[test]
    fn test_request_serializes_camel_case_config() {
        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: vec![Part::Text {
                    text: "instructions".to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: "classify".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 1.0,
                response_mime_type: "application/json".to_string(),
                response_schema: keywords_schema(&["flood".to_string()]),
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "classify");
    }

    #[test]
    fn test_response_parsing() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"keywords\":[\"flood\"]}" }] }
            }]
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).unwrap();
        let text = &parsed.candidates[0].content.parts[0].text;
        let payload: KeywordsPayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.keywords, vec!["flood"]);
    }
}
