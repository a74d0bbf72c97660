//! Document Reader — turns a resume file on disk into plain text.
//!
//! PDF goes through `pdf-extract`, DOCX is unzipped and its `word/document.xml`
//! stripped to text, TXT/MD are read as-is. Parsing is CPU-bound and runs inside
//! `tokio::task::spawn_blocking`; a panic inside a parser is reported as a corrupt
//! document rather than taking the worker down.

mod docx;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported format '{extension}' (supported: pdf, docx, txt, md)")]
    UnsupportedFormat { extension: String },

    #[error("corrupt document {}: {reason}", .path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    #[error("path {} is outside the resume directory", .0.display())]
    OutsideRoot(PathBuf),
}

/// Resolves `requested` inside `root`. Relative paths are joined onto `root`,
/// absolute ones must already lie under it, and `..` may not climb above it.
/// The check is lexical; `root` is expected to be canonical.
pub fn resolve_within(root: &Path, requested: &Path) -> Result<PathBuf, DocumentError> {
    let outside = || DocumentError::OutsideRoot(requested.to_path_buf());
    let relative = if requested.is_absolute() {
        requested.strip_prefix(root).map_err(|_| outside())?
    } else {
        requested
    };

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => {
                resolved.pop();
                depth -= 1;
            }
            _ => return Err(outside()),
        }
    }
    Ok(resolved)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "txt" | "md" => Ok(DocumentFormat::PlainText),
            _ => Err(DocumentError::UnsupportedFormat { extension }),
        }
    }
}

/// Converts a file path into plain text.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Reads documents straight from the local filesystem.
pub struct FsDocumentReader;

#[async_trait]
impl DocumentReader for FsDocumentReader {
    async fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        let format = DocumentFormat::from_path(path)?;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DocumentError::FileNotFound(path.to_path_buf()));
        }

        debug!("Extracting {:?} text from {}", format, path.display());

        let owned = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || extract_blocking(&owned, format)).await;

        let text = match result {
            Ok(inner) => inner?,
            Err(join_err) => {
                return Err(DocumentError::CorruptDocument {
                    path: path.to_path_buf(),
                    reason: format!("parser aborted: {join_err}"),
                })
            }
        };

        if text.trim().is_empty() {
            return Err(DocumentError::CorruptDocument {
                path: path.to_path_buf(),
                reason: "no extractable text".to_string(),
            });
        }

        info!(
            "Read {} ({} characters)",
            path.display(),
            text.chars().count()
        );
        Ok(text)
    }
}

fn extract_blocking(path: &Path, format: DocumentFormat) -> Result<String, DocumentError> {
    let corrupt = |reason: String| DocumentError::CorruptDocument {
        path: path.to_path_buf(),
        reason,
    };

    match format {
        DocumentFormat::Pdf => pdf_extract::extract_text(path).map_err(|e| corrupt(format!("{e:?}"))),
        DocumentFormat::Docx => docx::extract_text(path).map_err(|e| corrupt(e.to_string())),
        DocumentFormat::PlainText => {
            let bytes = std::fs::read(path).map_err(|e| corrupt(e.to_string()))?;
            String::from_utf8(bytes).map_err(|_| corrupt("file is not valid UTF-8".to_string()))
        }
    }
}
