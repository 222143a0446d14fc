//! Flat-file vector store.
//!
//! A [`VectorStore`] owns one directory holding two sibling artifacts that
//! are always written together:
//! - `metadata.json` — ordered chunk records plus the last-used embedding
//!   model name;
//! - `vectors.bin` — the embedding matrix: a 16-byte header (magic `DVEC`,
//!   format version, row count, column count) followed by row-major
//!   little-endian `f32` data.
//!
//! The whole store lives in memory; every mutation rewrites both artifacts
//! via a temp-file-then-rename so a crash never leaves a partial file.
//! Search is an exact brute-force cosine scan over all rows.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::{assign_ids, Chunker};
use crate::embedding::EmbeddingBackend;
use crate::models::{Document, DocumentChunk, SearchResult};

pub const METADATA_FILE: &str = "metadata.json";
pub const VECTORS_FILE: &str = "vectors.bin";

const VECTORS_MAGIC: [u8; 4] = *b"DVEC";
const VECTORS_VERSION: u32 = 1;
const VECTORS_HEADER_LEN: usize = 16;

/// Added to both norms in the cosine computation so zero vectors score 0
/// instead of dividing by zero.
const NORM_EPSILON: f32 = 1e-10;

/// Typed failures of the store.
///
/// Validation errors (`Shape`, `DimensionMismatch`) are fail-fast and leave
/// the store untouched. Load errors (`LoadConsistency`, `Corrupt`) are fatal
/// to the instance. Provider failures cross `add_documents` unchanged inside
/// `Embedding`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding output is not a rectangular matrix aligned with its inputs,
    /// or a query embedding is not exactly one row.
    #[error("embedding shape error: {0}")]
    Shape(String),

    /// New embeddings disagree with the store's established width.
    #[error("embedding dimension mismatch: store holds {expected}-dimensional vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The two on-disk artifacts disagree in row count.
    #[error("store artifacts disagree: {chunks} chunk records vs {rows} vector rows")]
    LoadConsistency { chunks: usize, rows: usize },

    /// The vector artifact's header or length is invalid.
    #[error("vector artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata artifact error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding provider failure (network, auth), propagated unchanged.
    #[error("embedding provider error: {0}")]
    Embedding(anyhow::Error),
}

/// Shape of `metadata.json`.
#[derive(Serialize)]
struct MetadataArtifact<'a> {
    version: u32,
    chunks: &'a [DocumentChunk],
    embedding_model: Option<&'a str>,
}

#[derive(Deserialize)]
struct MetadataArtifactOwned {
    #[serde(default)]
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    chunks: Vec<DocumentChunk>,
    #[serde(default)]
    embedding_model: Option<String>,
}

/// Persisted pairing of chunk records and their embeddings for one directory.
pub struct VectorStore {
    dir: PathBuf,
    chunks: Vec<DocumentChunk>,
    /// Row-major embedding matrix; row `i` belongs to `chunks[i]`.
    embeddings: Vec<f32>,
    /// Embedding width; 0 until the first successful ingest fixes it.
    dims: usize,
    embedding_model: Option<String>,
    chunker: Chunker,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("dir", &self.dir)
            .field("chunks", &self.chunks)
            .field("embeddings", &self.embeddings)
            .field("dims", &self.dims)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open a store directory, creating it if needed, and load both
    /// artifacts when present. A store with one or neither artifact starts
    /// empty.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut store = Self {
            dir,
            chunks: Vec::new(),
            embeddings: Vec::new(),
            dims: 0,
            embedding_model: None,
            chunker: Chunker::new(),
        };
        store.load()?;
        Ok(store)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let metadata_path = self.metadata_path();
        let vectors_path = self.vectors_path();
        if !metadata_path.exists() || !vectors_path.exists() {
            return Ok(());
        }

        let meta: MetadataArtifactOwned = serde_json::from_slice(&fs::read(metadata_path)?)?;
        let (embeddings, rows, dims) = decode_matrix(&fs::read(vectors_path)?)?;

        if rows != meta.chunks.len() {
            return Err(StoreError::LoadConsistency {
                chunks: meta.chunks.len(),
                rows,
            });
        }

        self.chunks = meta.chunks;
        self.embeddings = embeddings;
        self.dims = dims;
        self.embedding_model = meta.embedding_model;
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let meta = MetadataArtifact {
            version: 1,
            chunks: &self.chunks,
            embedding_model: self.embedding_model.as_deref(),
        };
        let meta_bytes = serde_json::to_vec_pretty(&meta)?;
        let rows = self.chunk_count();
        let vec_bytes = encode_matrix(&self.embeddings, rows, self.dims);

        write_atomic(&self.metadata_path(), &meta_bytes)?;
        write_atomic(&self.vectors_path(), &vec_bytes)?;
        Ok(())
    }

    /// Chunk the documents, embed every new chunk text in one provider call,
    /// append chunks and embedding rows, and rewrite both artifacts.
    ///
    /// Documents that chunk to nothing are skipped; if no document yields a
    /// chunk this is a no-op. Returns the number of chunks added.
    pub async fn add_documents(
        &mut self,
        documents: &[Document],
        embedder: &dyn EmbeddingBackend,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize, StoreError> {
        let mut new_chunks: Vec<DocumentChunk> = Vec::new();
        let mut chunk_texts: Vec<String> = Vec::new();

        for document in documents {
            let pieces = self.chunker.split(&document.content, chunk_size, chunk_overlap);
            let ids = assign_ids(&pieces, &document.id);
            for (id, content) in ids.into_iter().zip(pieces) {
                new_chunks.push(DocumentChunk {
                    id,
                    document_id: document.id.clone(),
                    source: document.source.clone(),
                    content: content.clone(),
                    metadata: Arc::clone(&document.metadata),
                });
                chunk_texts.push(content);
            }
        }

        if new_chunks.is_empty() {
            return Ok(0);
        }

        let matrix = embedder
            .embed(&chunk_texts)
            .await
            .map_err(StoreError::Embedding)?;
        let width = validate_matrix(&matrix, chunk_texts.len())?;

        if self.dims != 0 && width != self.dims {
            return Err(StoreError::DimensionMismatch {
                expected: self.dims,
                got: width,
            });
        }

        self.dims = width;
        for row in &matrix {
            self.embeddings.extend_from_slice(row);
        }
        self.chunks.append(&mut new_chunks);
        self.embedding_model = Some(embedder.model_name().to_string());

        self.persist()?;
        Ok(chunk_texts.len())
    }

    /// Rank every stored chunk against a single-row query embedding and
    /// return at most `top_k` results, best first. Equal scores keep
    /// insertion order. An empty store returns an empty vector for any
    /// `top_k`; `top_k == 0` always returns an empty vector.
    pub fn search(
        &self,
        query: &[Vec<f32>],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != 1 {
            return Err(StoreError::Shape(format!(
                "query embedding must be a single row, got {} rows",
                query.len()
            )));
        }
        let query = &query[0];
        if query.len() != self.dims {
            return Err(StoreError::DimensionMismatch {
                expected: self.dims,
                got: query.len(),
            });
        }

        let query_norm = norm(query) + NORM_EPSILON;
        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .enumerate()
            .map(|(idx, row)| {
                let dot: f32 = row.iter().zip(query).map(|(a, b)| a * b).sum();
                let similarity = dot / ((norm(row) + NORM_EPSILON) * query_norm);
                (idx, similarity)
            })
            .collect();

        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| SearchResult {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Embedding width, fixed by the first ingest; `None` while empty.
    pub fn embedding_dimension(&self) -> Option<usize> {
        (self.dims != 0).then_some(self.dims)
    }

    /// Model name recorded on the last ingest (informational).
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.embeddings.chunks_exact(self.dims.max(1))
    }

    /// Raw row-major matrix data, for tests and diagnostics.
    #[allow(dead_code)]
    pub fn embedding_rows(&self) -> Vec<Vec<f32>> {
        if self.dims == 0 {
            return Vec::new();
        }
        self.embeddings
            .chunks_exact(self.dims)
            .map(|row| row.to_vec())
            .collect()
    }
}

/// Require a rectangular matrix with one row per input text and a nonzero
/// width; returns the width.
fn validate_matrix(matrix: &[Vec<f32>], expected_rows: usize) -> Result<usize, StoreError> {
    if matrix.len() != expected_rows {
        return Err(StoreError::Shape(format!(
            "provider returned {} rows for {} texts",
            matrix.len(),
            expected_rows
        )));
    }
    let width = matrix[0].len();
    if width == 0 {
        return Err(StoreError::Shape("provider returned empty rows".to_string()));
    }
    if let Some(bad) = matrix.iter().find(|row| row.len() != width) {
        return Err(StoreError::Shape(format!(
            "ragged embedding matrix: expected width {}, found row of width {}",
            width,
            bad.len()
        )));
    }
    Ok(width)
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// `vectors.bin` layout: `DVEC` magic, version, rows, cols (all `u32`,
/// little-endian), then row-major `f32` data.
fn encode_matrix(data: &[f32], rows: usize, cols: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(VECTORS_HEADER_LEN + data.len() * 4);
    out.extend_from_slice(&VECTORS_MAGIC);
    out.extend_from_slice(&VECTORS_VERSION.to_le_bytes());
    out.extend_from_slice(&(rows as u32).to_le_bytes());
    out.extend_from_slice(&(cols as u32).to_le_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn decode_matrix(bytes: &[u8]) -> Result<(Vec<f32>, usize, usize), StoreError> {
    if bytes.len() < VECTORS_HEADER_LEN {
        return Err(StoreError::Corrupt("file shorter than header".to_string()));
    }
    if bytes[..4] != VECTORS_MAGIC {
        return Err(StoreError::Corrupt("bad magic".to_string()));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VECTORS_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported format version {version}"
        )));
    }
    let rows = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    let cols = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;

    let expected_len = VECTORS_HEADER_LEN + rows * cols * 4;
    if bytes.len() != expected_len {
        return Err(StoreError::Corrupt(format!(
            "expected {} bytes for {}x{} matrix, found {}",
            expected_len,
            rows,
            cols,
            bytes.len()
        )));
    }

    let data = bytes[VECTORS_HEADER_LEN..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((data, rows, cols))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_roundtrip() {
        let data = vec![1.0f32, -2.5, 3.125, 0.0, -0.001, 42.0];
        let bytes = encode_matrix(&data, 2, 3);
        let (restored, rows, cols) = decode_matrix(&bytes).unwrap();
        assert_eq!(restored, data);
        assert_eq!((rows, cols), (2, 3));
    }

    #[test]
    fn test_matrix_rejects_bad_magic() {
        let mut bytes = encode_matrix(&[1.0], 1, 1);
        bytes[0] = b'X';
        assert!(matches!(
            decode_matrix(&bytes),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_matrix_rejects_truncated_data() {
        let mut bytes = encode_matrix(&[1.0, 2.0], 1, 2);
        bytes.pop();
        assert!(matches!(
            decode_matrix(&bytes),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_validate_matrix_ragged() {
        let matrix = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            validate_matrix(&matrix, 2),
            Err(StoreError::Shape(_))
        ));
    }

    #[test]
    fn test_validate_matrix_row_count() {
        let matrix = vec![vec![1.0, 2.0]];
        assert!(matches!(
            validate_matrix(&matrix, 2),
            Err(StoreError::Shape(_))
        ));
        assert_eq!(validate_matrix(&matrix, 1).unwrap(), 2);
    }
}
