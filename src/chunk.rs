//! Sliding-window text chunker.
//!
//! Splits document text into overlapping chunks of at most `chunk_size`
//! units, advancing `max(1, chunk_size - chunk_overlap)` units per chunk so
//! the window always moves forward, even when the overlap is as large as the
//! window.
//!
//! Two strategies produce the same window/step behavior over different
//! units:
//! - **tokens** — `cl100k_base` BPE via tiktoken; each window of token ids
//!   is decoded back to text;
//! - **characters** — the fallback when the tokenizer cannot be built or a
//!   decode fails, operating on Unicode scalar values.
//!
//! Strategy selection is a capability probe at construction time; tokenizer
//! failures never reach the caller.

use tiktoken_rs::{cl100k_base, CoreBPE};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Minimum zero-padding width for chunk ordinals.
const MIN_ID_WIDTH: usize = 4;

/// Splits text into overlapping chunks, preferring token windows.
pub struct Chunker {
    bpe: Option<CoreBPE>,
}

impl Chunker {
    /// Probe the tokenizer once; a failed probe pins the character strategy.
    pub fn new() -> Self {
        Self {
            bpe: cl100k_base().ok(),
        }
    }

    /// Split `text` into chunks of at most `chunk_size` units with
    /// `chunk_overlap` units repeated between consecutive chunks.
    ///
    /// Empty input yields an empty vector.
    pub fn split(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if let Some(bpe) = &self.bpe {
            if let Some(chunks) = split_by_tokens(bpe, text, chunk_size, chunk_overlap) {
                return chunks;
            }
        }
        split_by_chars(text, chunk_size, chunk_overlap)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance per chunk; at least 1 so overlap >= size cannot stall the window.
fn step(chunk_size: usize, chunk_overlap: usize) -> usize {
    chunk_size.saturating_sub(chunk_overlap).max(1)
}

/// Token windows decoded back to text. Returns `None` on any decode failure
/// so the caller can fall back to the character strategy.
fn split_by_tokens(
    bpe: &CoreBPE,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Option<Vec<String>> {
    let tokens = bpe.encode_with_special_tokens(text);
    let step = step(chunk_size, chunk_overlap);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = tokens.len().min(start + chunk_size);
        let piece = bpe.decode(tokens[start..end].to_vec()).ok()?;
        chunks.push(piece);
        start += step;
    }
    Some(chunks)
}

/// Identical sliding window over Unicode scalar values.
fn split_by_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = step(chunk_size, chunk_overlap);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = chars.len().min(start + chunk_size);
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}

/// Assign 1-based ordinal identifiers `"{prefix}-{ordinal}"`, zero-padded so
/// the largest ordinal fits (at least [`MIN_ID_WIDTH`] digits). Identifiers
/// sort lexicographically in insertion order.
pub fn assign_ids(chunks: &[String], prefix: &str) -> Vec<String> {
    if chunks.is_empty() {
        return Vec::new();
    }
    let width = id_width(chunks.len());
    (1..=chunks.len())
        .map(|ordinal| format!("{prefix}-{ordinal:0width$}"))
        .collect()
}

fn id_width(count: usize) -> usize {
    count.to_string().len().max(MIN_ID_WIDTH)
}
