//! Website connector: breadth-first crawl of one documentation site.
//!
//! Starts from a base URL, follows same-host links (optionally restricted to
//! path prefixes), and turns each fetched page into a [`Document`] with
//! `{url, title}` metadata. Pages that fail to fetch are warned about and
//! skipped; a polite delay separates successive requests.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::json;

use crate::config::WebSource;
use crate::extract::extract_page;
use crate::models::{Document, Metadata};

const USER_AGENT: &str = concat!("deskbase/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT_SECS: u64 = 15;

/// Crawl a website and return the extracted documents, at most
/// `source.max_pages` of them, in visit order.
pub async fn crawl_website(source: &WebSource) -> Result<Vec<Document>> {
    let base = Url::parse(&source.url)
        .with_context(|| format!("invalid crawl URL: {}", source.url))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;

    let mut queue = VecDeque::from([base.clone()]);
    let mut seen: HashSet<String> = HashSet::new();
    let mut documents = Vec::new();

    while let Some(url) = queue.pop_front() {
        if documents.len() >= source.max_pages {
            break;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }

        let html = match fetch_page(&client, &url).await {
            Ok(html) => html,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", url, e);
                continue;
            }
        };

        let page = extract_page(&html);
        let url_str = url.to_string();
        let title = page.title.unwrap_or_else(|| url_str.clone());

        let mut metadata = Metadata::new();
        metadata.insert("url".to_string(), json!(url_str));
        metadata.insert("title".to_string(), json!(title));
        documents.push(Document::new(url_str, "web", page.text, metadata));

        if documents.len() >= source.max_pages {
            break;
        }

        for href in &page.links {
            if let Some(link) = resolve_link(&url, &base, href, &source.allowed_paths) {
                if !seen.contains(link.as_str()) {
                    queue.push_back(link);
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(source.delay_ms)).await;
    }

    Ok(documents)
}

async fn fetch_page(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Resolve `href` against the page URL and keep it only when it stays on the
/// base host (and inside `allowed_paths`, when given). Fragments are
/// stripped so anchors do not multiply the queue.
fn resolve_link(page_url: &Url, base: &Url, href: &str, allowed_paths: &[String]) -> Option<Url> {
    let mut absolute = page_url.join(href).ok()?;
    absolute.set_fragment(None);

    if absolute.host_str() != base.host_str() || absolute.port() != base.port() {
        return None;
    }
    if !allowed_paths.is_empty()
        && !allowed_paths
            .iter()
            .any(|prefix| absolute.path().starts_with(prefix.as_str()))
    {
        return None;
    }
    Some(absolute)
}
