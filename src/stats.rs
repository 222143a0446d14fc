//! Store statistics and health overview.
//!
//! Prints a quick summary of what's stored: chunk counts, embedding
//! dimension and model, artifact sizes, and a per-source breakdown. Used by
//! `desk stats` to give confidence that ingests are working as expected.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;

use crate::config::Config;
use crate::store::{VectorStore, METADATA_FILE, VECTORS_FILE};

/// Per-source breakdown of document and chunk counts.
struct SourceStats {
    doc_count: usize,
    chunk_count: usize,
}

pub fn run_stats(config: &Config) -> Result<()> {
    let store = VectorStore::open(&config.store.dir)?;

    let artifacts_size: u64 = [METADATA_FILE, VECTORS_FILE]
        .iter()
        .filter_map(|name| std::fs::metadata(store.dir().join(name)).ok())
        .map(|m| m.len())
        .sum();

    println!("Deskbase — Store Stats");
    println!("======================");
    println!();
    println!("  Store:       {}", store.dir().display());
    println!("  Size:        {}", format_bytes(artifacts_size));
    println!();
    println!("  Chunks:      {}", store.chunk_count());
    println!(
        "  Dimension:   {}",
        store
            .embedding_dimension()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Model:       {}",
        store.embedding_model().unwrap_or("-")
    );

    let mut by_source: BTreeMap<&str, (HashSet<&str>, usize)> = BTreeMap::new();
    for chunk in store.chunks() {
        let entry = by_source.entry(&chunk.source).or_default();
        entry.0.insert(&chunk.document_id);
        entry.1 += 1;
    }
    let by_source: BTreeMap<&str, SourceStats> = by_source
        .into_iter()
        .map(|(source, (docs, chunks))| {
            (
                source,
                SourceStats {
                    doc_count: docs.len(),
                    chunk_count: chunks,
                },
            )
        })
        .collect();

    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<24} {:>6} {:>8}", "SOURCE", "DOCS", "CHUNKS");
        println!("  {}", "-".repeat(40));
        for (source, stats) in &by_source {
            println!(
                "  {:<24} {:>6} {:>8}",
                source, stats.doc_count, stats.chunk_count
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
