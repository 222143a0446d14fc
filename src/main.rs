//! # Deskbase CLI (`desk`)
//!
//! The `desk` binary is the primary interface for Deskbase. It provides
//! commands for ingesting documentation sources, searching the store,
//! chatting over it, inspecting store health, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! desk --config ./desk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `desk ingest` | Crawl/load configured sources, chunk, embed, and persist |
//! | `desk search "<query>"` | Rank stored chunks against a query |
//! | `desk chat` | Interactive Q&A session with citations |
//! | `desk stats` | Show store size, counts, and per-source breakdown |
//! | `desk serve` | Start the HTTP chat server |
//!
//! ## Examples
//!
//! ```bash
//! # Crawl a documentation site ad hoc
//! desk ingest --web-url https://docs.example.com --max-pages 30
//!
//! # Ingest everything configured in desk.toml
//! desk ingest --config ./desk.toml
//!
//! # Retrieval only
//! desk search "how do I reset my password"
//!
//! # Interactive chat
//! desk chat --top-k 8
//!
//! # Web UI on a custom port
//! desk serve --bind 0.0.0.0:9000
//! ```

mod chat;
mod chunk;
mod config;
mod connector_notion;
mod connector_web;
mod embedding;
mod engine;
mod extract;
mod ingest;
mod llm;
mod models;
mod search;
mod server;
mod stats;
mod store;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Default config path probed when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "./desk.toml";

/// Deskbase CLI — a local-first AI helpdesk over your documentation.
#[derive(Parser)]
#[command(
    name = "desk",
    about = "Deskbase — a local-first AI helpdesk over your documentation",
    version,
    long_about = "Deskbase crawls documentation sites and Notion exports, splits them into \
    overlapping chunks, stores OpenAI embeddings in a flat-file vector store, and answers \
    questions over it with citations via CLI and HTTP."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When omitted, `./desk.toml` is used if it exists; otherwise built-in
    /// defaults apply.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory used to persist the vector store (overrides `[store] dir`).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest documents from configured or ad-hoc sources.
    ///
    /// Crawls websites and loads Notion exports, chunks the text, embeds
    /// every chunk with the configured provider, and rewrites the store.
    /// Direct flags override the `[[sources.*]]` lists in the config.
    Ingest {
        /// Single web URL to crawl (overrides configured sources).
        #[arg(long)]
        web_url: Option<String>,

        /// Maximum number of pages to crawl when using --web-url.
        #[arg(long, default_value_t = 20)]
        max_pages: usize,

        /// Path to a Notion export (file, directory, or .zip archive).
        #[arg(long)]
        notion_file: Option<PathBuf>,
    },

    /// Rank stored chunks against a query and print them.
    ///
    /// Embeds the query and scores it against every stored chunk by cosine
    /// similarity. Retrieval only — no answer generation.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start an interactive chat session.
    ///
    /// Each question is answered from the most relevant stored chunks, with
    /// the references listed after the answer.
    Chat {
        /// Number of chunks to retrieve for each question.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show store statistics.
    ///
    /// Prints chunk counts, embedding dimension and model, artifact sizes,
    /// and a per-source breakdown.
    Stats,

    /// Start the HTTP chat server.
    ///
    /// Serves the embedded chat UI on `/` and the JSON API on `/api/chat`.
    Serve {
        /// Bind address (overrides `[server] bind`).
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => config::Config::default(),
    };
    if let Some(dir) = cli.store_dir {
        config.store.dir = dir;
    }

    match cli.command {
        Commands::Ingest {
            web_url,
            max_pages,
            notion_file,
        } => ingest::run_ingest(&config, web_url, max_pages, notion_file).await,
        Commands::Search { query, limit } => search::run_search(&config, &query, limit).await,
        Commands::Chat { top_k } => chat::run_chat(&config, top_k).await,
        Commands::Stats => stats::run_stats(&config),
        Commands::Serve { bind } => server::run_server(&config, bind).await,
    }
}
