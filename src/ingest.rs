//! Ingestion orchestration.
//!
//! Coordinates the full ingest flow: acquisition (web crawl, Notion export)
//! → chunking → embedding → persisted store. Direct CLI flags override the
//! configured source list; otherwise every configured source is ingested in
//! config order.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{Config, WebSource};
use crate::connector_notion::load_notion_export;
use crate::connector_web::crawl_website;
use crate::embedding::create_embedder;
use crate::models::Document;
use crate::store::VectorStore;

pub async fn run_ingest(
    config: &Config,
    web_url: Option<String>,
    max_pages: usize,
    notion_file: Option<PathBuf>,
) -> Result<()> {
    let mut documents: Vec<Document> = Vec::new();

    if web_url.is_some() || notion_file.is_some() {
        if let Some(url) = web_url {
            let source = WebSource::ad_hoc(url, max_pages);
            documents.extend(crawl_source(&source).await?);
        }
        if let Some(path) = notion_file {
            let docs = load_notion_export(&path, "notion")?;
            println!("loaded notion export {} ({} documents)", path.display(), docs.len());
            documents.extend(docs);
        }
    } else {
        for source in &config.sources.web {
            documents.extend(crawl_source(source).await?);
        }
        for source in &config.sources.notion {
            let docs = load_notion_export(&source.path, &source.id)?;
            println!(
                "loaded notion export {} ({} documents)",
                source.path.display(),
                docs.len()
            );
            documents.extend(docs);
        }
    }

    if documents.is_empty() {
        println!("No documents found. Configure [[sources.web]] / [[sources.notion]] or pass --web-url / --notion-file.");
        return Ok(());
    }

    let mut store = VectorStore::open(&config.store.dir)?;
    let embedder = create_embedder(&config.embedding)?;
    let added = store
        .add_documents(
            &documents,
            embedder.as_ref(),
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        )
        .await?;

    println!("ingest");
    println!("  documents: {}", documents.len());
    println!("  chunks added: {}", added);
    println!("  total chunks: {}", store.chunk_count());
    if let Some(dims) = store.embedding_dimension() {
        println!("  dimension: {}", dims);
    }
    println!("  store: {}", store.dir().display());
    println!("ok");

    Ok(())
}

async fn crawl_source(source: &WebSource) -> Result<Vec<Document>> {
    println!("crawling {} (max {} pages)", source.url, source.max_pages);
    let docs = crawl_website(source).await?;
    println!("  pages fetched: {}", docs.len());
    Ok(docs)
}
