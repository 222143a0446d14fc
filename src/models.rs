//! Core data models for Deskbase.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and retrieval pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key-value metadata attached to a document (title, url, path, ...).
///
/// All chunks of one document share a single `Arc` of this map; the map is
/// never mutated after the document is built.
pub type Metadata = serde_json::Map<String, Value>;

/// A raw document ingested from one of the knowledge sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier, unique within one ingestion batch (e.g. a page URL).
    pub id: String,
    /// Origin tag, e.g. `"web"` or `"notion"`.
    pub source: String,
    /// Full extracted text.
    pub content: String,
    #[serde(default)]
    pub metadata: Arc<Metadata>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            content: content.into(),
            metadata: Arc::new(metadata),
        }
    }
}

/// A bounded, possibly-overlapping piece of a document — the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// `"{document_id}-{zero-padded ordinal}"`, unique within the store.
    pub id: String,
    /// Back-reference to the parent [`Document`].
    pub document_id: String,
    /// Copied from the parent document.
    pub source: String,
    /// Substring of the parent content.
    pub content: String,
    /// Shared with the parent document and its sibling chunks.
    #[serde(default)]
    pub metadata: Arc<Metadata>,
}

/// A retrieved chunk paired with its cosine-similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

impl SearchResult {
    /// Human-readable citation: the metadata `title` when present and
    /// non-empty, else `path`, else `None` (callers fall back to the chunk id).
    pub fn citation(&self) -> Option<&str> {
        metadata_str(&self.chunk.metadata, "title")
            .or_else(|| metadata_str(&self.chunk.metadata, "path"))
    }
}

fn metadata_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk_with_metadata(metadata: Metadata) -> DocumentChunk {
        DocumentChunk {
            id: "doc-0001".to_string(),
            document_id: "doc".to_string(),
            source: "web".to_string(),
            content: "hello".to_string(),
            metadata: Arc::new(metadata),
        }
    }

    #[test]
    fn test_citation_prefers_title() {
        let mut meta = Metadata::new();
        meta.insert("title".to_string(), json!("Getting Started"));
        meta.insert("path".to_string(), json!("docs/start.md"));
        let result = SearchResult {
            chunk: chunk_with_metadata(meta),
            score: 0.5,
        };
        assert_eq!(result.citation(), Some("Getting Started"));
    }

    #[test]
    fn test_citation_falls_back_to_path() {
        let mut meta = Metadata::new();
        meta.insert("title".to_string(), json!(""));
        meta.insert("path".to_string(), json!("docs/start.md"));
        let result = SearchResult {
            chunk: chunk_with_metadata(meta),
            score: 0.5,
        };
        assert_eq!(result.citation(), Some("docs/start.md"));
    }

    #[test]
    fn test_citation_none_when_unset() {
        let result = SearchResult {
            chunk: chunk_with_metadata(Metadata::new()),
            score: 0.5,
        };
        assert_eq!(result.citation(), None);
    }

    #[test]
    fn test_chunks_share_parent_metadata() {
        let mut meta = Metadata::new();
        meta.insert("url".to_string(), json!("https://example.com"));
        let doc = Document::new("d1", "web", "body", meta);

        let chunk = DocumentChunk {
            id: "d1-0001".to_string(),
            document_id: doc.id.clone(),
            source: doc.source.clone(),
            content: doc.content.clone(),
            metadata: Arc::clone(&doc.metadata),
        };
        assert!(Arc::ptr_eq(&doc.metadata, &chunk.metadata));
    }
}
