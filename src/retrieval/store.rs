//! Persisted vector store read from `index.json`.
//!
//! The file is produced by an external ingestion step. This module only
//! loads it and runs exact cosine-similarity search over the stored vectors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DocumentChunk, IndexError, ScoredChunk};

/// File name of the index inside the persist directory.
pub const INDEX_FILE_NAME: &str = "index.json";

/// One stored chunk together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub embedding: Vec<f32>,
}

/// On-disk layout of the index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    pub embeddings_model: String,
    pub chunks: Vec<StoredChunk>,
}

/// In-memory vector store, read-only after loading.
#[derive(Debug, Clone)]
pub struct VectorStore {
    embeddings_model: String,
    chunks: Vec<StoredChunk>,
    dimensions: Option<usize>,
}

impl VectorStore {
    /// Opens the store persisted in `dir`.
    ///
    /// # Errors
    ///
    /// - `IndexError::Missing` if the directory or index file does not exist
    /// - `IndexError::Io` if the file cannot be read
    /// - `IndexError::Corrupt` if the JSON is malformed or embeddings disagree
    ///   on their dimensionality
    pub fn open(dir: &Path) -> Result<Self, IndexError> {
        let path = dir.join(INDEX_FILE_NAME);
        if !path.is_file() {
            return Err(IndexError::Missing(path));
        }

        let data = std::fs::read_to_string(&path).map_err(|source| IndexError::Io {
            path: path.clone(),
            source,
        })?;
        let file: IndexFile = serde_json::from_str(&data).map_err(|e| IndexError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Self::from_index_file(file).map_err(|reason| IndexError::Corrupt { path, reason })
    }

    /// Builds a store from an already parsed index file.
    ///
    /// Returns the reason as an error string if the embeddings are not all
    /// of the same, non-zero length.
    pub fn from_index_file(file: IndexFile) -> Result<Self, String> {
        let dimensions = file.chunks.first().map(|c| c.embedding.len());
        if dimensions == Some(0) {
            return Err("chunk 0 has an empty embedding".to_string());
        }
        if let Some(dims) = dimensions
            && let Some((i, chunk)) = file
                .chunks
                .iter()
                .enumerate()
                .find(|(_, c)| c.embedding.len() != dims)
        {
            return Err(format!(
                "chunk {} has {} dimensions, expected {}",
                i,
                chunk.embedding.len(),
                dims
            ));
        }

        Ok(Self {
            embeddings_model: file.embeddings_model,
            chunks: file.chunks,
            dimensions,
        })
    }

    /// Returns the embeddings model the store was built with.
    pub fn embeddings_model(&self) -> &str {
        &self.embeddings_model
    }

    /// Returns the embedding dimensionality, `None` for an empty store.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns up to `k` chunks ranked by cosine similarity to `query`.
    ///
    /// Equal scores keep insertion order, so identical inputs always
    /// produce identical output.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| {
                let stored = &self.chunks[i];
                ScoredChunk {
                    chunk: DocumentChunk {
                        content: stored.content.clone(),
                        source: stored.source.clone(),
                        metadata: stored.metadata.clone(),
                    },
                    score,
                }
            })
            .collect()
    }
}

/// Returns the path of the index file inside `dir`.
pub fn index_file_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE_NAME)
}

/// Cosine similarity; zero for mismatched or zero-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
