//! HTTP chat server.
//!
//! Exposes the helpdesk over a small JSON API plus an embedded single-page
//! chat UI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Embedded chat UI |
//! | `GET`  | `/healthz` | Health check |
//! | `POST` | `/api/chat` | Answer a question with references |
//!
//! # Error Contract
//!
//! Error responses use one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API cross-origin.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::engine::ChatEngine;
use crate::llm::create_chat_model;
use crate::store::VectorStore;

/// Upper bound for per-request `top_k`.
const MAX_TOP_K: usize = 20;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<ChatEngine>,
    default_top_k: usize,
}

/// Start the HTTP server; runs until the process is terminated.
pub async fn run_server(config: &Config, bind_override: Option<String>) -> Result<()> {
    let bind = bind_override.unwrap_or_else(|| config.server.bind.clone());

    let store = Arc::new(VectorStore::open(&config.store.dir)?);
    let embedder = create_embedder(&config.embedding)?;
    let chat_model = create_chat_model(&config.generation)?;
    let engine = Arc::new(ChatEngine::new(
        store,
        embedder,
        chat_model,
        config.generation.system_prompt.clone(),
    ));

    let state = AppState {
        engine,
        default_top_k: config.retrieval.top_k,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/chat", post(chat_endpoint))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    println!("Deskbase listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Request payload for the chat endpoint.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: String,
    top_k: Option<usize>,
}

/// Serialized reference returned to the UI.
#[derive(Debug, Serialize)]
struct ReferencePayload {
    chunk_id: String,
    document_id: String,
    citation: Option<String>,
    score: f32,
    content: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ChatResponsePayload {
    answer: String,
    references: Vec<ReferencePayload>,
}

async fn chat_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let question = payload.question.trim();
    if question.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "question must not be empty",
        );
    }

    let top_k = payload.top_k.unwrap_or(state.default_top_k);
    if top_k == 0 || top_k > MAX_TOP_K {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            &format!("top_k must be between 1 and {}", MAX_TOP_K),
        );
    }

    match state.engine.ask(question, top_k).await {
        Ok(response) => {
            let references = response
                .references
                .into_iter()
                .map(|result| ReferencePayload {
                    citation: result.citation().map(str::to_string),
                    chunk_id: result.chunk.id.clone(),
                    document_id: result.chunk.document_id.clone(),
                    score: result.score,
                    content: result.chunk.content.clone(),
                    source: result.chunk.source.clone(),
                })
                .collect();
            Json(ChatResponsePayload {
                answer: response.answer,
                references,
            })
            .into_response()
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            &format!("{:#}", e),
        ),
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": { "code": code, "message": message }
        })),
    )
        .into_response()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Deskbase</title>
    <style>
      body {
        margin: 0;
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif;
        background: #0f172a;
        color: #e2e8f0;
        display: flex;
        min-height: 100vh;
        justify-content: center;
        align-items: center;
        padding: 24px;
      }
      .card {
        background: rgba(15, 23, 42, 0.9);
        border: 1px solid rgba(148, 163, 184, 0.2);
        border-radius: 16px;
        width: min(960px, 100%);
        display: flex;
        flex-direction: column;
        overflow: hidden;
      }
      header { padding: 24px 32px 16px; border-bottom: 1px solid rgba(148, 163, 184, 0.2); }
      header h1 { margin: 0 0 8px; font-size: 1.5rem; }
      header p { margin: 0; color: rgba(226, 232, 240, 0.75); }
      main { padding: 24px 32px; display: flex; flex-direction: column; gap: 16px; }
      .chat-log { min-height: 320px; max-height: 480px; overflow-y: auto; }
      .message { margin-bottom: 18px; }
      .message strong { display: block; margin-bottom: 6px; color: #6366f1; }
      .message p { margin: 0 0 8px; white-space: pre-wrap; line-height: 1.6; }
      .references { margin: 0; padding-left: 18px; font-size: 0.9rem; color: rgba(226, 232, 240, 0.75); }
      form { display: flex; gap: 12px; }
      textarea {
        flex: 1; resize: vertical; min-height: 72px; padding: 12px;
        border-radius: 12px; border: 1px solid rgba(148, 163, 184, 0.4);
        background: rgba(15, 23, 42, 0.6); color: inherit; font-size: 1rem;
      }
      button {
        background: #6366f1; color: white; border: none; border-radius: 12px;
        padding: 0 24px; font-size: 1rem; cursor: pointer;
      }
      button:disabled { background: rgba(148, 163, 184, 0.4); cursor: not-allowed; }
    </style>
  </head>
  <body>
    <div class="card">
      <header>
        <h1>Deskbase</h1>
        <p>Ask questions about your documentation and receive answers with citations.</p>
      </header>
      <main>
        <div class="chat-log" id="chat-log"></div>
        <form id="chat-form">
          <textarea id="question" placeholder="Ask a question about your docs..." required></textarea>
          <button type="submit" id="submit-btn">Send</button>
        </form>
      </main>
    </div>
    <script>
      const form = document.getElementById("chat-form");
      const questionInput = document.getElementById("question");
      const chatLog = document.getElementById("chat-log");
      const submitBtn = document.getElementById("submit-btn");

      function appendMessage(role, content, references = []) {
        const wrapper = document.createElement("div");
        wrapper.className = "message";
        const header = document.createElement("strong");
        header.textContent = role === "user" ? "You" : "Assistant";
        const message = document.createElement("p");
        message.textContent = content;
        wrapper.appendChild(header);
        wrapper.appendChild(message);

        if (references.length > 0) {
          const list = document.createElement("ul");
          list.className = "references";
          references.forEach((ref, index) => {
            const item = document.createElement("li");
            const label = ref.citation || ref.chunk_id;
            item.textContent = `${index + 1}. ${label} (score ${ref.score.toFixed(3)})`;
            list.appendChild(item);
          });
          wrapper.appendChild(list);
        }

        chatLog.appendChild(wrapper);
        chatLog.scrollTop = chatLog.scrollHeight;
      }

      form.addEventListener("submit", async (event) => {
        event.preventDefault();
        const question = questionInput.value.trim();
        if (!question) return;
        appendMessage("user", question);
        submitBtn.disabled = true;
        questionInput.value = "";
        try {
          const response = await fetch("/api/chat", {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify({ question })
          });
          const data = await response.json();
          if (!response.ok) {
            throw new Error(data.error ? data.error.message : "Request failed");
          }
          appendMessage("assistant", data.answer, data.references);
        } catch (err) {
          appendMessage("assistant", `Error: ${err.message}`);
        } finally {
          submitBtn.disabled = false;
          questionInput.focus();
        }
      });
    </script>
  </body>
</html>
"#;
