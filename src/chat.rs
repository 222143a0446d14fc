//! Interactive chat session on stdin/stdout.
//!
//! Reads questions line by line, answers them through the [`ChatEngine`],
//! and lists the references used for each answer. EOF (Ctrl+D) ends the
//! session.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::engine::ChatEngine;
use crate::llm::create_chat_model;
use crate::store::VectorStore;

pub async fn run_chat(config: &Config, top_k: Option<usize>) -> Result<()> {
    let store = Arc::new(VectorStore::open(&config.store.dir)?);
    let embedder = create_embedder(&config.embedding)?;
    let chat_model = create_chat_model(&config.generation)?;
    let engine = ChatEngine::new(
        store,
        embedder,
        chat_model,
        config.generation.system_prompt.clone(),
    );
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    println!("Enter your questions. Press Ctrl+D to exit.\n");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("?> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!("\nGoodbye!");
            break;
        };
        let question = line?;
        let question = question.trim();
        if question.is_empty() {
            continue;
        }

        let response = engine.ask(question, top_k).await?;
        println!("\n{}\n", response.answer);
        if !response.references.is_empty() {
            println!("References:");
            for result in &response.references {
                let citation = result.citation().unwrap_or(&result.chunk.id);
                println!("- {} (score={:.3})", citation, result.score);
            }
            println!();
        }
    }

    Ok(())
}
