//! Persistent flat-matrix vector store backing the concept index.
//!
//! Stores one L2-normalized embedding row per entry id, keyed so repeated
//! upserts replace rows instead of appending. Persists as a raw f32 binary
//! plus a `.meta` JSON sidecar (ids, dimension, vocabulary hash) so startup
//! can decide whether the index still matches the loaded vocabulary.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

use super::IndexMatch;

/// Sidecar metadata persisted next to the matrix file.
#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    vocab_hash: String,
    dim: usize,
    ids: Vec<String>,
    concept_ids: Vec<String>,
}

/// In-memory vector store with id-keyed upsert and top-k cosine query.
pub struct VectorStore {
    /// Entry ids, one per matrix row
    ids: Vec<String>,
    /// Concept id metadata, one per matrix row
    concept_ids: Vec<String>,
    /// Flat row-major matrix of L2-normalized embeddings
    matrix: Vec<f32>,
    dim: usize,
    by_id: HashMap<String, usize>,
}

fn io_err(context: &str, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::IndexUnavailable {
        message: format!("{context}: {e}"),
        status_code: None,
    }
}

/// L2-normalize in place; zero vectors are left unchanged.
fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

impl VectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            concept_ids: Vec::new(),
            matrix: Vec::new(),
            dim: 0,
            by_id: HashMap::new(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Insert or replace the entry for `id`.
    ///
    /// The first insert fixes the embedding dimension; later vectors must
    /// match it. Rows are normalized on write so queries reduce to a dot
    /// product.
    pub fn upsert(
        &mut self,
        id: &str,
        concept_id: &str,
        mut vector: Vec<f32>,
    ) -> Result<(), PipelineError> {
        if vector.is_empty() {
            return Err(io_err("upsert", format!("empty embedding for '{id}'")));
        }
        if self.dim == 0 {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(io_err(
                "upsert",
                format!(
                    "dimension mismatch for '{id}': got {}, store has {}",
                    vector.len(),
                    self.dim
                ),
            ));
        }

        normalize(&mut vector);

        match self.by_id.get(id) {
            Some(&row) => {
                let offset = row * self.dim;
                self.matrix[offset..offset + self.dim].copy_from_slice(&vector);
                self.concept_ids[row] = concept_id.to_string();
            }
            None => {
                let row = self.ids.len();
                self.ids.push(id.to_string());
                self.concept_ids.push(concept_id.to_string());
                self.matrix.extend_from_slice(&vector);
                self.by_id.insert(id.to_string(), row);
            }
        }
        Ok(())
    }

    /// Return the `top_k` entries most similar to `query`, descending.
    ///
    /// A query vector whose dimension differs from the stored matrix is an
    /// index/embedder desync (e.g. the embedding model changed under a
    /// persisted index) and is reported as an error rather than "no matches".
    pub fn top_k(&self, query: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, PipelineError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(io_err(
                "query",
                format!(
                    "dimension mismatch: embedder produced {} dims, index holds {} — \
                     rebuild the index with the configured embedding model",
                    query.len(),
                    self.dim
                ),
            ));
        }

        let mut normalized = query.to_vec();
        normalize(&mut normalized);

        let mut scored: Vec<(usize, f32)> = (0..self.ids.len())
            .map(|row| {
                let offset = row * self.dim;
                let score: f32 = (0..self.dim)
                    .map(|j| normalized[j] * self.matrix[offset + j])
                    .sum();
                (row, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(row, score)| IndexMatch {
                concept_id: self.concept_ids[row].clone(),
                score,
            })
            .collect())
    }

    /// Persist the matrix and its metadata sidecar.
    pub fn save(&self, path: &Path, vocab_hash: &str) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err("create index dir", e))?;
        }

        let bytes: Vec<u8> = self.matrix.iter().flat_map(|f| f.to_le_bytes()).collect();
        std::fs::write(path, &bytes).map_err(|e| io_err("write index matrix", e))?;

        let meta = StoreMeta {
            vocab_hash: vocab_hash.to_string(),
            dim: self.dim,
            ids: self.ids.clone(),
            concept_ids: self.concept_ids.clone(),
        };
        let meta_path = path.with_extension("meta");
        let meta_json = serde_json::to_string(&meta).map_err(|e| io_err("encode index meta", e))?;
        std::fs::write(&meta_path, meta_json).map_err(|e| io_err("write index meta", e))?;

        tracing::info!(
            "Saved concept index: {} entries x {} dims ({:.1} MB) to {:?}",
            self.len(),
            self.dim,
            bytes.len() as f64 / 1_000_000.0,
            path
        );
        Ok(())
    }

    /// Load a persisted store and its vocabulary hash.
    ///
    /// Returns `Ok(None)` when no index has been persisted at `path` yet.
    pub fn load(path: &Path) -> Result<Option<(Self, String)>, PipelineError> {
        let meta_path = path.with_extension("meta");
        if !path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_json =
            std::fs::read_to_string(&meta_path).map_err(|e| io_err("read index meta", e))?;
        let meta: StoreMeta =
            serde_json::from_str(&meta_json).map_err(|e| io_err("parse index meta", e))?;

        let bytes = std::fs::read(path).map_err(|e| io_err("read index matrix", e))?;
        let expected = meta.ids.len() * meta.dim * 4;
        if bytes.len() != expected {
            return Err(io_err(
                "load index",
                format!(
                    "matrix size mismatch: expected {expected} bytes for {} entries, got {}",
                    meta.ids.len(),
                    bytes.len()
                ),
            ));
        }

        let matrix: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let by_id = meta
            .ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), row))
            .collect();

        tracing::info!("Loaded concept index: {} entries from {:?}", meta.ids.len(), path);

        Ok(Some((
            Self {
                ids: meta.ids,
                concept_ids: meta.concept_ids,
                matrix,
                dim: meta.dim,
                by_id,
            },
            meta.vocab_hash,
        )))
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}
