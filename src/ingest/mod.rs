//! Document ingestion
//!
//! Retrieves uploaded document bytes and recovers text from them. Real PDF
//! decoding is out of scope: `parse_pdf` does a best-effort scan over the raw
//! bytes and the pipeline falls back to placeholder text when a document has
//! no stored bytes at all.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Text recovered from a document
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    pub text: String,

    /// At least 1, estimated from page markers
    pub page_count: usize,

    pub metadata: Option<PdfMetadata>,
}

/// Document metadata, when present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Capability to fetch a document's stored bytes
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Stored bytes for a document, or None when nothing was uploaded
    async fn pdf_bytes(&self, document_id: &str) -> Result<Option<Vec<u8>>>;
}

/// Extract text from document bytes.
///
/// Scans for `/Text (...)` literals and estimates the page count from
/// `/Type /Page` markers. Arbitrary bytes never fail: when nothing is
/// recoverable the whole payload is treated as plain text, and an empty
/// payload degrades to a placeholder line.
pub fn parse_pdf(bytes: &[u8]) -> Result<PdfText> {
    let raw = String::from_utf8_lossy(bytes);

    let fragments = extract_text_literals(&raw);
    let text = if fragments.is_empty() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            "No text content could be extracted from this document".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        fragments.join(" ")
    };

    Ok(PdfText {
        text,
        page_count: count_pages(&raw).max(1),
        metadata: None,
    })
}

/// Collect the parenthesized literals following `/Text` markers
fn extract_text_literals(raw: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut rest = raw;

    while let Some(marker) = rest.find("/Text") {
        rest = &rest[marker + "/Text".len()..];
        let trimmed = rest.trim_start();
        if let Some(body) = trimmed.strip_prefix('(') {
            if let Some(close) = body.find(')') {
                fragments.push(body[..close].to_string());
                rest = &body[close + 1..];
            }
        }
    }

    fragments
}

/// Count `/Type /Page` markers, excluding `/Type /Pages` tree nodes
fn count_pages(raw: &str) -> usize {
    let mut count = 0;
    let mut rest = raw;

    while let Some(marker) = rest.find("/Type") {
        rest = &rest[marker + "/Type".len()..];
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("/Page") {
            if !after.starts_with('s') {
                count += 1;
            }
        }
    }

    count
}

/// Filesystem-backed document source
///
/// Stores uploaded bytes as `<dir>/<document_id>.pdf`.
pub struct FsDocumentSource {
    dir: PathBuf,
}

impl FsDocumentSource {
    /// Create a source rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Ingest(format!(
                "Failed to create document directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Store uploaded bytes for a document
    pub fn store(&self, document_id: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path_for(document_id), bytes)?;
        Ok(())
    }

    /// Whether bytes exist for a document
    pub fn exists(&self, document_id: &str) -> bool {
        self.path_for(document_id).exists()
    }

    /// Delete stored bytes; returns whether anything was removed
    pub fn delete(&self, document_id: &str) -> bool {
        let path = self.path_for(document_id);
        path.exists() && fs::remove_file(path).is_ok()
    }

    fn path_for(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", document_id))
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn pdf_bytes(&self, document_id: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(document_id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }
}
