//! Chat engine: glue between retrieval and generation.
//!
//! [`ChatEngine::ask`] embeds the question, ranks stored chunks, builds a
//! numbered context block, and asks the chat model to answer from that
//! context only. When nothing relevant is stored, it short-circuits with a
//! canned answer instead of calling the model.

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::EmbeddingBackend;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::SearchResult;
use crate::store::VectorStore;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI helpdesk assistant. Answer questions \
    using only the provided context. Cite the titles or paths of the relevant documents in \
    parentheses. If the answer is not present in the context, say you do not know.";

const EMPTY_STORE_ANSWER: &str = "I could not find any relevant information in the knowledge \
    base. Please ingest documents before chatting.";

pub struct ChatResponse {
    pub answer: String,
    pub references: Vec<SearchResult>,
}

pub struct ChatEngine {
    store: Arc<VectorStore>,
    embedder: Box<dyn EmbeddingBackend>,
    chat_model: Box<dyn ChatModel>,
    system_prompt: String,
}

impl ChatEngine {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Box<dyn EmbeddingBackend>,
        chat_model: Box<dyn ChatModel>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            chat_model,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Retrieve the `top_k` most relevant chunks and answer from them.
    pub async fn ask(&self, question: &str, top_k: usize) -> Result<ChatResponse> {
        let query = self.embedder.embed(&[question.to_string()]).await?;
        let references = self.store.search(&query, top_k)?;
        let context = build_context(&references);

        if context.is_empty() {
            return Ok(ChatResponse {
                answer: EMPTY_STORE_ANSWER.to_string(),
                references: Vec::new(),
            });
        }

        let messages = [
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(format!("Context:\n{context}\n\nQuestion: {question}\n")),
        ];
        let answer = self.chat_model.generate(&messages).await?;

        Ok(ChatResponse { answer, references })
    }
}

/// Numbered `[Source N: citation]` segments joined by blank lines.
fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let citation = result.citation().unwrap_or(&result.chunk.id);
            format!(
                "[Source {}: {}]\n{}",
                idx + 1,
                citation,
                result.chunk.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
