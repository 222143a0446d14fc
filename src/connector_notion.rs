//! Notion connector: loads workspace exports from disk.
//!
//! Accepts the three shapes a Notion export shows up in:
//! - a single Markdown/text file → one document;
//! - a directory tree of exported files → one document per file;
//! - the `.zip` archive Notion actually produces → one document per entry.
//!
//! Documents keep the originating path in metadata so citations can point
//! back at the export.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;
use walkdir::WalkDir;

use crate::models::{Document, Metadata};

/// File extensions picked up from directories and archives.
const EXPORT_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "csv"];

/// Decompressed size cap per archive entry (zip-bomb protection).
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Load a Notion export into documents tagged with `source_id`.
pub fn load_notion_export(path: &Path, source_id: &str) -> Result<Vec<Document>> {
    if !path.exists() {
        bail!("Notion export not found: {}", path.display());
    }

    if path.is_dir() {
        return load_directory(path, source_id);
    }
    if path.extension().and_then(|e| e.to_str()) == Some("zip") {
        return load_archive(path, source_id);
    }
    load_single_file(path, source_id).map(|doc| vec![doc])
}

fn load_single_file(path: &Path, source_id: &str) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut metadata = Metadata::new();
    metadata.insert("path".to_string(), json!(path.display().to_string()));
    Ok(Document::new(id, source_id, content, metadata))
}

fn load_directory(root: &Path, source_id: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_export_extension(&path.to_string_lossy()) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let id = strip_extension(&relative.to_string_lossy());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let mut metadata = Metadata::new();
        metadata.insert("path".to_string(), json!(path.display().to_string()));
        documents.push(Document::new(id, source_id, content, metadata));
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(documents)
}

fn load_archive(path: &Path, source_id: &str) -> Result<Vec<Document>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", path.display()))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| has_export_extension(name))
        .map(|name| name.to_string())
        .collect();
    names.sort();

    let mut documents = Vec::new();
    for name in names {
        let entry = archive
            .by_name(&name)
            .with_context(|| format!("failed to read archive entry {}", name))?;
        if entry.is_dir() {
            continue;
        }

        let mut bytes = Vec::new();
        entry
            .take(MAX_ENTRY_BYTES)
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read archive entry {}", name))?;
        if bytes.len() as u64 >= MAX_ENTRY_BYTES {
            bail!("archive entry {} exceeds size limit", name);
        }

        let mut metadata = Metadata::new();
        metadata.insert("path".to_string(), json!(name.clone()));
        documents.push(Document::new(
            strip_extension(&name),
            source_id,
            String::from_utf8_lossy(&bytes).into_owned(),
            metadata,
        ));
    }
    Ok(documents)
}

fn has_export_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| EXPORT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn strip_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_extension_filter() {
        assert!(has_export_extension("Page abc123.md"));
        assert!(has_export_extension("table.CSV"));
        assert!(!has_export_extension("image.png"));
        assert!(!has_export_extension("README"));
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("Area/Page abc.md"), "Area/Page abc");
        assert_eq!(strip_extension("README"), "README");
    }

    #[test]
    fn test_single_file_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Welcome.md");
        std::fs::write(&file, "# Welcome\n\nHello.").unwrap();

        let docs = load_notion_export(&file, "notion").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "Welcome");
        assert_eq!(docs[0].source, "notion");
        assert!(docs[0].content.contains("Hello."));
        assert_eq!(
            docs[0].metadata.get("path").and_then(|v| v.as_str()),
            Some(file.display().to_string().as_str())
        );
    }

    #[test]
    fn test_directory_export_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "beta").unwrap();
        std::fs::write(dir.path().join("a.md"), "alpha").unwrap();
        std::fs::write(dir.path().join("skip.png"), "binary").unwrap();

        let docs = load_notion_export(dir.path(), "notion").unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_path_errors() {
        let err = load_notion_export(Path::new("/nonexistent/export.md"), "notion");
        assert!(err.is_err());
    }
}
