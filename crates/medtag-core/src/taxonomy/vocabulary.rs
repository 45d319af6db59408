//! Vocabulary loading from the taxonomy JSON document.
//!
//! Parses the publisher's concept set, drops retired records, normalizes
//! parent references, and builds the read-only id-to-concept map shared by
//! the index builder and the hierarchy walker.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::index::IndexEntry;
use crate::types::Concept;

/// Namespace prefix of concept ids in the Media Topics vocabulary.
const ID_PREFIX: &str = "medtop";

/// Suffix appended to index entry ids (one embedded definition per concept).
const DEF_SUFFIX: &str = ":def";

/// Top-level shape of the taxonomy JSON document.
#[derive(Debug, Deserialize)]
pub struct TaxonomyDocument {
    /// Flat list of concept records
    #[serde(rename = "conceptSet", default)]
    pub concept_set: Vec<ConceptRecord>,

    /// URIs of the root "broad topic" concepts
    #[serde(rename = "hasTopConcept", default)]
    pub has_top_concept: Vec<String>,
}

/// One raw concept record as published.
#[derive(Debug, Deserialize)]
pub struct ConceptRecord {
    /// Namespaced concept id, e.g. "medtop:20000418"
    pub qcode: Option<String>,

    /// Display label keyed by language tag
    #[serde(rename = "prefLabel", default)]
    pub pref_label: HashMap<String, String>,

    /// Definition keyed by language tag
    #[serde(default)]
    pub definition: HashMap<String, String>,

    /// URIs of broader (parent) concepts
    #[serde(default)]
    pub broader: Vec<String>,

    /// Present (with a retirement date) when the concept is retired
    #[serde(default)]
    pub retired: Option<serde_json::Value>,
}

/// The loaded vocabulary: id-to-concept map plus ordered root ids.
///
/// Built once at startup, read-only thereafter.
#[derive(Debug)]
pub struct Vocabulary {
    concepts: HashMap<String, Concept>,
    roots: Vec<String>,
}

/// Normalize a concept URI reference to a namespaced id.
///
/// "https://cv.iptc.org/newscodes/mediatopic/20000418" -> "medtop:20000418".
/// Already-namespaced ids pass through unchanged.
fn normalize_ref(reference: &str) -> String {
    if reference.starts_with(ID_PREFIX) {
        return reference.to_string();
    }
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    format!("{ID_PREFIX}:{tail}")
}

impl Vocabulary {
    /// Load the vocabulary from a locally cached taxonomy JSON file.
    pub fn load(path: &Path, lang: &str) -> Result<Self, PipelineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::MalformedVocabulary {
                path: path.to_path_buf(),
                message: format!(
                    "cannot read taxonomy file ({e}); run `medtag taxonomy download` first"
                ),
            })?;

        let document: TaxonomyDocument =
            serde_json::from_str(&content).map_err(|e| PipelineError::MalformedVocabulary {
                path: path.to_path_buf(),
                message: format!("invalid taxonomy JSON: {e}"),
            })?;

        Self::from_document(document, lang, path)
    }

    /// Build the vocabulary from a parsed taxonomy document.
    ///
    /// Retired records are excluded entirely. A record without a `qcode` is
    /// a hard error; parent references that never resolve surface later, at
    /// walk time.
    pub fn from_document(
        document: TaxonomyDocument,
        lang: &str,
        source: &Path,
    ) -> Result<Self, PipelineError> {
        let mut concepts = HashMap::new();

        for record in document.concept_set {
            if record.retired.is_some() {
                continue;
            }

            let id = record
                .qcode
                .ok_or_else(|| PipelineError::MalformedVocabulary {
                    path: source.to_path_buf(),
                    message: "concept record without a qcode".to_string(),
                })?;

            let label = record.pref_label.get(lang).cloned().unwrap_or_default();
            let definition = record.definition.get(lang).cloned().unwrap_or_default();
            let parent_ids: Vec<String> =
                record.broader.iter().map(|uri| normalize_ref(uri)).collect();

            concepts.insert(
                id.clone(),
                Concept {
                    id,
                    label,
                    definition,
                    parent_ids,
                },
            );
        }

        let roots: Vec<String> = document
            .has_top_concept
            .iter()
            .map(|uri| normalize_ref(uri))
            .filter(|id| concepts.contains_key(id))
            .collect();

        tracing::info!(
            "Loaded vocabulary: {} concepts, {} broad topics",
            concepts.len(),
            roots.len()
        );

        Ok(Self { concepts, roots })
    }

    /// Look up a concept by its namespaced id.
    pub fn get(&self, id: &str) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Number of (non-retired) concepts.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// The root "broad topic" concepts, in published order.
    pub fn broad_topics(&self) -> Vec<&Concept> {
        self.roots.iter().filter_map(|id| self.concepts.get(id)).collect()
    }

    /// Index entries for every concept with a non-empty definition.
    ///
    /// Entry id is `"<concept_id>:def"`, document is the definition text,
    /// metadata the bare concept id. Sorted by id so the entry list — and
    /// therefore the persisted index — is a deterministic function of the
    /// vocabulary content.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        let mut entries: Vec<IndexEntry> = self
            .concepts
            .values()
            .filter(|c| !c.definition.is_empty())
            .map(|c| IndexEntry {
                id: format!("{}{}", c.id, DEF_SUFFIX),
                document: c.definition.clone(),
                concept_id: c.id.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// BLAKE3 hash of the vocabulary content.
    ///
    /// Covers ids and definitions in sorted order; used to decide whether a
    /// persisted index still matches the loaded vocabulary.
    pub fn content_hash(&self) -> String {
        let mut ids: Vec<&String> = self.concepts.keys().collect();
        ids.sort();

        let mut hasher = blake3::Hasher::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(self.concepts[id].definition.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_json() -> &'static str {
        r#"{
            "conceptSet": [
                {
                    "qcode": "medtop:06000000",
                    "prefLabel": {"en-US": "environment"},
                    "definition": {"en-US": "All aspects of protection, damage, and condition of the ecosystem."},
                    "broader": []
                },
                {
                    "qcode": "medtop:20000418",
                    "prefLabel": {"en-US": "flood"},
                    "definition": {"en-US": "Overflow of water onto land that is normally dry."},
                    "broader": ["https://cv.iptc.org/newscodes/mediatopic/06000000"]
                },
                {
                    "qcode": "medtop:99000001",
                    "prefLabel": {"en-US": "old topic"},
                    "definition": {"en-US": "No longer in use."},
                    "broader": [],
                    "retired": "2010-12-01T00:00:00+00:00"
                },
                {
                    "qcode": "medtop:20000419",
                    "prefLabel": {"en-US": "undefined topic"},
                    "definition": {},
                    "broader": ["https://cv.iptc.org/newscodes/mediatopic/06000000"]
                }
            ],
            "hasTopConcept": [
                "https://cv.iptc.org/newscodes/mediatopic/06000000",
                "https://cv.iptc.org/newscodes/mediatopic/99000001"
            ]
        }"#
    }

    fn load_sample() -> Vocabulary {
        let document: TaxonomyDocument = serde_json::from_str(sample_json()).unwrap();
        Vocabulary::from_document(document, "en-US", Path::new("test.json")).unwrap()
    }

    #[test]
    fn test_retired_concepts_excluded() {
        let vocab = load_sample();
        assert!(vocab.get("medtop:99000001").is_none());
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_parent_uri_normalization() {
        let vocab = load_sample();
        let flood = vocab.get("medtop:20000418").unwrap();
        assert_eq!(flood.parent_ids, vec!["medtop:06000000".to_string()]);
    }

    #[test]
    fn test_broad_topics_skip_retired_roots() {
        let vocab = load_sample();
        let roots = vocab.broad_topics();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].label, "environment");
    }

    #[test]
    fn test_index_entries_require_definition() {
        let vocab = load_sample();
        let entries = vocab.index_entries();
        // "undefined topic" has no definition in the lookup language
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.id.ends_with(":def")));
        assert!(entries
            .iter()
            .any(|e| e.concept_id == "medtop:20000418"
                && e.document.starts_with("Overflow of water")));
    }

    #[test]
    fn test_index_entries_sorted_and_deterministic() {
        let vocab = load_sample();
        let a = vocab.index_entries();
        let b = vocab.index_entries();
        assert_eq!(
            a.iter().map(|e| &e.id).collect::<Vec<_>>(),
            b.iter().map(|e| &e.id).collect::<Vec<_>>()
        );
        let mut sorted = a.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        sorted.sort();
        assert_eq!(sorted, a.iter().map(|e| e.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_qcode_is_malformed() {
        let json = r#"{"conceptSet": [{"prefLabel": {"en-US": "orphan"}}], "hasTopConcept": []}"#;
        let document: TaxonomyDocument = serde_json::from_str(json).unwrap();
        let err = Vocabulary::from_document(document, "en-US", Path::new("test.json")).unwrap_err();
        assert!(err.to_string().contains("qcode"));
    }

    #[test]
    fn test_content_hash_stable_and_sensitive() {
        let vocab = load_sample();
        assert_eq!(vocab.content_hash(), load_sample().content_hash());

        let trimmed = r#"{
            "conceptSet": [
                {
                    "qcode": "medtop:06000000",
                    "prefLabel": {"en-US": "environment"},
                    "definition": {"en-US": "All aspects of protection, damage, and condition of the ecosystem."}
                }
            ],
            "hasTopConcept": []
        }"#;
        let document: TaxonomyDocument = serde_json::from_str(trimmed).unwrap();
        let other = Vocabulary::from_document(document, "en-US", Path::new("test.json")).unwrap();
        assert_ne!(vocab.content_hash(), other.content_hash());
    }

    #[test]
    fn test_load_missing_file_points_at_download() {
        let err = Vocabulary::load(Path::new("/nonexistent/taxonomy.json"), "en-US").unwrap_err();
        assert!(err.to_string().contains("taxonomy download"));
    }
}
