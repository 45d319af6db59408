//! LLM topic classification over retrieved candidates.

pub mod gemini;
pub mod openai;
pub mod provider;

pub use provider::{
    CaptionRequest, CaptionResponse, ClassifierFactory, ClassifyInput, ClassifyRequest,
    ClassifyResponse, ImageInput, TopicClassifier, VocabularyEntry,
};
