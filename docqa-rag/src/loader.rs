//! Document loaders.
//!
//! A loader turns a file into a [`Document`] of ordered page texts. Form feeds
//! (`\x0c`) mark page breaks in text files; PDFs are extracted page by page.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

const PAGE_BREAK: char = '\x0c';

/// Extracts ordered page texts from a source document.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load the document at `path`.
    ///
    /// Returns [`RagError::Load`] if the file is missing, unreadable or in an
    /// unsupported format.
    async fn load(&self, path: &Path) -> Result<Document>;
}

fn load_err(path: &Path, message: impl Into<String>) -> RagError {
    RagError::Load { source_path: path.display().to_string(), message: message.into() }
}

fn document_id(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "document".into())
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    // A trailing form feed closes the last page rather than opening a new one.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

fn into_document(path: &Path, pages: Vec<String>) -> Document {
    debug!(path = %path.display(), pages = pages.len(), "loaded document");
    Document::new(document_id(path), pages).with_source_uri(path.display().to_string())
}

/// Loads UTF-8 text and markdown files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<Document> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| load_err(path, e.to_string()))?;
        Ok(into_document(path, split_pages(&text)))
    }
}

/// Loads PDF files with `pdf-extract`.
///
/// Extraction is CPU-bound and runs on the blocking thread pool.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

#[cfg(feature = "pdf")]
#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Document> {
        let bytes = tokio::fs::read(path).await.map_err(|e| load_err(path, e.to_string()))?;

        let pages =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
                .await
                .map_err(|e| load_err(path, format!("extraction task failed: {e}")))?
                .map_err(|e| load_err(path, format!("could not extract text: {e}")))?;

        Ok(into_document(path, pages))
    }
}

/// Picks a loader from the file extension.
///
/// `.txt`, `.md` and `.markdown` go to [`TextLoader`]; `.pdf` goes to
/// `PdfLoader` when the `pdf` feature is enabled. Anything else is a
/// [`RagError::Load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoLoader;

#[async_trait]
impl DocumentLoader for AutoLoader {
    async fn load(&self, path: &Path) -> Result<Document> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "md" | "markdown" => TextLoader.load(path).await,
            #[cfg(feature = "pdf")]
            "pdf" => PdfLoader.load(path).await,
            other => Err(load_err(path, format!("unsupported document format '{other}'"))),
        }
    }
}
