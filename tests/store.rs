//! Store integration tests: persistence round-trips, validation failures,
//! and search ranking over scripted embedders.

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use deskbase::embedding::EmbeddingBackend;
use deskbase::models::{Document, Metadata};
use deskbase::store::{StoreError, VectorStore, METADATA_FILE, VECTORS_FILE};

/// Deterministic embedder: each text maps to a fixed-width vector derived
/// from its bytes.
struct HashEmbedder {
    dims: usize,
}

#[async_trait]
impl EmbeddingBackend for HashEmbedder {
    fn model_name(&self) -> &str {
        "scripted-hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let bytes = text.as_bytes();
                (0..self.dims)
                    .map(|i| {
                        let byte = bytes.get(i % bytes.len().max(1)).copied().unwrap_or(0);
                        byte as f32 / 255.0
                    })
                    .collect()
            })
            .collect())
    }
}

/// Embedder with a fixed text → vector table, for tests that need exact
/// cosine geometry.
struct TableEmbedder;

#[async_trait]
impl EmbeddingBackend for TableEmbedder {
    fn model_name(&self) -> &str {
        "table"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| match text.as_str() {
                "east" => vec![1.0, 0.0],
                "north" => vec![0.0, 1.0],
                "west" => vec![-1.0, 0.0],
                other => panic!("unexpected text: {other}"),
            })
            .collect())
    }
}

fn doc(id: &str, content: &str) -> Document {
    let mut meta = Metadata::new();
    meta.insert("title".to_string(), json!(format!("Title of {id}")));
    Document::new(id, "web", content, meta)
}

/// One-chunk document whose content is a `TableEmbedder` key.
fn direction_doc(direction: &str) -> Document {
    Document::new(direction, "web", direction, Metadata::new())
}

#[tokio::test]
async fn test_add_documents_then_reopen_round_trips() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");

    let docs = vec![
        doc("alpha", &"all work and no play makes jack a dull boy ".repeat(40)),
        doc("beta", "short document"),
    ];
    let embedder = HashEmbedder { dims: 8 };

    let mut store = VectorStore::open(&dir).unwrap();
    let added = store.add_documents(&docs, &embedder, 50, 10).await.unwrap();
    assert!(added > 1, "long document should produce several chunks");
    assert_eq!(store.chunk_count(), added);
    assert_eq!(store.embedding_dimension(), Some(8));
    assert_eq!(store.embedding_model(), Some("scripted-hash"));

    // first chunk of each document carries the padded ordinal
    assert_eq!(store.chunks()[0].id, "alpha-0001");
    assert!(store.chunks().iter().any(|c| c.id == "beta-0001"));

    let chunks_before = store.chunks().to_vec();
    let rows_before = store.embedding_rows();
    drop(store);

    let reopened = VectorStore::open(&dir).unwrap();
    assert_eq!(reopened.chunks(), chunks_before.as_slice());
    assert_eq!(reopened.embedding_rows(), rows_before);
    assert_eq!(reopened.embedding_dimension(), Some(8));
    assert_eq!(reopened.embedding_model(), Some("scripted-hash"));
}

#[tokio::test]
async fn test_chunks_share_one_metadata_allocation() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("store")).unwrap();

    let docs = vec![doc("alpha", &"word ".repeat(200))];
    store
        .add_documents(&docs, &HashEmbedder { dims: 4 }, 20, 5)
        .await
        .unwrap();

    assert!(store.chunk_count() > 1);
    let first = &store.chunks()[0];
    for chunk in store.chunks() {
        assert!(Arc::ptr_eq(&first.metadata, &chunk.metadata));
    }
}

#[tokio::test]
async fn test_dimension_mismatch_leaves_store_unchanged() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");

    let mut store = VectorStore::open(&dir).unwrap();
    store
        .add_documents(&[doc("alpha", "first")], &HashEmbedder { dims: 4 }, 500, 100)
        .await
        .unwrap();

    let chunks_before = store.chunks().to_vec();
    let rows_before = store.embedding_rows();

    let err = store
        .add_documents(&[doc("beta", "second")], &HashEmbedder { dims: 6 }, 500, 100)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DimensionMismatch {
            expected: 4,
            got: 6
        }
    ));

    assert_eq!(store.chunks(), chunks_before.as_slice());
    assert_eq!(store.embedding_rows(), rows_before);

    // disk state is also untouched
    let reopened = VectorStore::open(&dir).unwrap();
    assert_eq!(reopened.chunks(), chunks_before.as_slice());
    assert_eq!(reopened.embedding_rows(), rows_before);
}

#[tokio::test]
async fn test_empty_ingest_is_a_noop() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");
    let mut store = VectorStore::open(&dir).unwrap();

    let added = store
        .add_documents(&[], &HashEmbedder { dims: 4 }, 500, 100)
        .await
        .unwrap();
    assert_eq!(added, 0);

    // a document with empty content chunks to nothing
    let added = store
        .add_documents(
            &[Document::new("empty", "web", "", Metadata::new())],
            &HashEmbedder { dims: 4 },
            500,
            100,
        )
        .await
        .unwrap();
    assert_eq!(added, 0);

    // nothing was persisted
    assert!(!dir.join(METADATA_FILE).exists());
    assert!(!dir.join(VECTORS_FILE).exists());
}

#[test]
fn test_search_on_empty_store_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let store = VectorStore::open(tmp.path().join("store")).unwrap();

    for top_k in [0, 1, 100] {
        let results = store.search(&[vec![1.0, 0.0]], top_k).unwrap();
        assert!(results.is_empty());
    }
}

#[tokio::test]
async fn test_search_ranks_by_cosine_similarity() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("store")).unwrap();

    let docs = vec![
        direction_doc("east"),
        direction_doc("north"),
        direction_doc("west"),
    ];
    store
        .add_documents(&docs, &TableEmbedder, 500, 100)
        .await
        .unwrap();

    let results = store.search(&[vec![1.0, 0.0]], 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.id, "east-0001");
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[1].chunk.id, "north-0001");
    assert!(results[1].score.abs() < 1e-5);

    // top_k beyond the chunk count returns everything, still descending
    let all = store.search(&[vec![1.0, 0.0]], 10).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].chunk.id, "west-0001");
    assert!((all[2].score + 1.0).abs() < 1e-5);
    assert!(all[0].score >= all[1].score && all[1].score >= all[2].score);

    // top_k == 0 returns nothing
    assert!(store.search(&[vec![1.0, 0.0]], 0).unwrap().is_empty());
}

#[tokio::test]
async fn test_search_ties_keep_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("store")).unwrap();

    // two identical vectors, then an orthogonal one
    let docs = vec![
        direction_doc("east"),
        Document::new("east2", "web", "east", Metadata::new()),
        direction_doc("north"),
    ];
    store
        .add_documents(&docs, &TableEmbedder, 500, 100)
        .await
        .unwrap();

    let results = store.search(&[vec![1.0, 0.0]], 3).unwrap();
    assert_eq!(results[0].chunk.id, "east-0001");
    assert_eq!(results[1].chunk.id, "east2-0001");
    assert_eq!(results[2].chunk.id, "north-0001");
}

#[tokio::test]
async fn test_search_validates_query_shape() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("store")).unwrap();
    store
        .add_documents(&[direction_doc("east")], &TableEmbedder, 500, 100)
        .await
        .unwrap();

    // two rows is not a query
    let err = store
        .search(&[vec![1.0, 0.0], vec![0.0, 1.0]], 5)
        .unwrap_err();
    assert!(matches!(err, StoreError::Shape(_)));

    // wrong width cannot be scored
    let err = store.search(&[vec![1.0, 0.0, 0.0]], 5).unwrap_err();
    assert!(matches!(err, StoreError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn test_open_rejects_mismatched_artifacts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");

    let mut store = VectorStore::open(&dir).unwrap();
    store
        .add_documents(&[direction_doc("east")], &TableEmbedder, 500, 100)
        .await
        .unwrap();
    drop(store);

    // rewrite the vector artifact as a valid but empty 0x0 matrix
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"DVEC");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    fs::write(dir.join(VECTORS_FILE), bytes).unwrap();

    let err = VectorStore::open(&dir).unwrap_err();
    assert!(matches!(
        err,
        StoreError::LoadConsistency { chunks: 1, rows: 0 }
    ));
}

#[tokio::test]
async fn test_open_with_missing_artifact_starts_empty() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");

    let mut store = VectorStore::open(&dir).unwrap();
    store
        .add_documents(&[direction_doc("east")], &TableEmbedder, 500, 100)
        .await
        .unwrap();
    drop(store);

    fs::remove_file(dir.join(VECTORS_FILE)).unwrap();
    let store = VectorStore::open(&dir).unwrap();
    assert_eq!(store.chunk_count(), 0);
    assert_eq!(store.embedding_dimension(), None);
}

/// An embedder returning a ragged matrix must be rejected before mutation.
struct RaggedEmbedder;

#[async_trait]
impl EmbeddingBackend for RaggedEmbedder {
    fn model_name(&self) -> &str {
        "ragged"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, _)| vec![0.5; 3 + i])
            .collect())
    }
}

#[tokio::test]
async fn test_ragged_embeddings_rejected() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("store");
    let mut store = VectorStore::open(&dir).unwrap();

    let docs = vec![direction_doc("east"), direction_doc("north")];
    let err = store
        .add_documents(&docs, &RaggedEmbedder, 500, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Shape(_)));
    assert_eq!(store.chunk_count(), 0);
    assert!(!dir.join(METADATA_FILE).exists());
}
