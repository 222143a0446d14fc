//! Retrieval without generation: rank stored chunks against a query.
//!
//! Embeds the query with the configured provider, scores it against the
//! store, and prints ranked results with scores, citations, and excerpts.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::store::VectorStore;

/// Longest excerpt printed per result.
const EXCERPT_CHARS: usize = 240;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let store = VectorStore::open(&config.store.dir)?;
    if store.chunk_count() == 0 {
        println!("No results. The store is empty — run `desk ingest` first.");
        return Ok(());
    }

    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let embedder = create_embedder(&config.embedding)?;
    let query_embedding = embedder.embed(&[query.to_string()]).await?;
    let results = store.search(&query_embedding, top_k)?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (idx, result) in results.iter().enumerate() {
        let label = result.citation().unwrap_or(&result.chunk.id);
        println!(
            "{}. [{:.3}] {} / {}",
            idx + 1,
            result.score,
            result.chunk.source,
            label
        );
        println!("    excerpt: \"{}\"", excerpt(&result.chunk.content));
        println!("    id: {}", result.chunk.id);
        println!();
    }

    Ok(())
}

fn excerpt(content: &str) -> String {
    let flattened = content.replace('\n', " ");
    let trimmed = flattened.trim();
    let mut out: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    if trimmed.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}
