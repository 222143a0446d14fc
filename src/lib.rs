//! # Deskbase
//!
//! A local-first AI helpdesk over your documentation.
//!
//! Deskbase ingests documentation sites and Notion exports, splits them
//! into overlapping retrievable chunks, stores OpenAI embeddings alongside
//! chunk text and provenance in a flat-file vector store, and answers
//! questions over it — with citations — via a CLI and a small HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────────┐
//! │  Connectors  │──▶│ Chunk + Embed │──▶│  Vector Store    │
//! │ web / notion │   │               │   │ metadata.json    │
//! └──────────────┘   └───────────────┘   │ vectors.bin      │
//!                                        └───────┬─────────┘
//!                            ┌──────────────────┤
//!                            ▼                  ▼
//!                      ┌──────────┐       ┌──────────┐
//!                      │   CLI    │       │   HTTP   │
//!                      │  (desk)  │       │ (/api)   │
//!                      └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! desk ingest --web-url https://docs.example.com   # crawl and embed
//! desk search "reset password"                     # retrieval only
//! desk chat                                        # Q&A with citations
//! desk serve                                       # web UI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`store`] | Flat-file vector store and cosine search |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Generation provider abstraction |
//! | [`engine`] | Retrieval + generation chat engine |
//! | [`connector_web`] | Website crawler |
//! | [`connector_notion`] | Notion export loader |
//! | [`extract`] | HTML text extraction |
//! | [`server`] | HTTP chat server |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod connector_notion;
pub mod connector_web;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
