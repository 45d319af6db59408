//! Core data types for the medtag tagging pipeline.

use serde::{Deserialize, Serialize};

/// A single concept in the controlled vocabulary.
///
/// Immutable after load. Concepts form a DAG oriented toward a small set of
/// root "broad topic" nodes; a concept may list more than one parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Namespaced unique id (e.g., "medtop:20000418")
    pub id: String,

    /// Display label in the configured language
    pub label: String,

    /// Definition text — the document embedded into the concept index
    pub definition: String,

    /// Normalized ids of broader (parent) concepts; empty for root topics
    pub parent_ids: Vec<String>,
}

impl Concept {
    /// Whether this is a root "broad topic" (no broader concepts).
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }
}

/// One row of the ranked concept table produced by a retrieval run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConcept {
    /// Concept display label
    pub label: String,

    /// Occurrence count across all hierarchy walks in the query
    pub count: usize,

    /// First-seen definition for the label
    pub definition: String,
}

/// Full output of a tagging run: the retrieved candidate table plus the
/// model-selected keywords (empty when classification was not requested).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResult {
    /// Ranked candidate concepts from semantic retrieval
    pub retrieved: Vec<RankedConcept>,

    /// Labels the classifier selected from the candidate vocabulary
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keywords: Vec<String>,

    /// Model identifier that produced `keywords`, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Structured result of an image captioning call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResult {
    /// Descriptive caption phrased with controlled-vocabulary concepts
    pub caption: String,

    /// Broad-level concepts relevant to the image contents
    pub concepts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_is_root() {
        let root = Concept {
            id: "medtop:06000000".to_string(),
            label: "environment".to_string(),
            definition: "All aspects of protection...".to_string(),
            parent_ids: vec![],
        };
        assert!(root.is_root());

        let leaf = Concept {
            id: "medtop:20000418".to_string(),
            label: "flood".to_string(),
            definition: "Overflow of water onto land".to_string(),
            parent_ids: vec!["medtop:03000000".to_string()],
        };
        assert!(!leaf.is_root());
    }

    #[test]
    fn test_tag_result_skips_empty_keywords() {
        let result = TagResult {
            retrieved: vec![RankedConcept {
                label: "environment".to_string(),
                count: 4,
                definition: "def".to_string(),
            }],
            keywords: vec![],
            model: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("keywords"));
        assert!(!json.contains("model"));

        let parsed: TagResult = serde_json::from_str(&json).unwrap();
        assert!(parsed.keywords.is_empty());
    }

    #[test]
    fn test_caption_result_roundtrip() {
        let caption = CaptionResult {
            caption: "A flooded street after heavy rain".to_string(),
            concepts: vec!["flood".to_string(), "weather".to_string()],
        };
        let json = serde_json::to_string(&caption).unwrap();
        let parsed: CaptionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.caption, caption.caption);
        assert_eq!(parsed.concepts, caption.concepts);
    }
}
