//! DocQA Parser - Document loading and chunking
//!
//! Reads the documents an index is built from:
//! - `DirectoryReader` scans a directory for allow-listed file extensions
//! - `DocumentParser` implementations turn one file into one `Document`
//! - `chunk_text` splits document text into overlapping chunks for embedding

pub mod chunk;
pub mod reader;

pub use chunk::{chunk_document, chunk_text, ChunkConfig, TextChunk};
pub use reader::DirectoryReader;

use chrono::{DateTime, Utc};
use docqa_core::{Document, DocumentMetadata};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading documents
#[derive(Error, Debug)]
pub enum ParserError {
    /// Input directory is missing or not a directory
    #[error("Directory {0} does not exist.")]
    DirectoryNotFound(String),

    /// No file in the directory matched the allow-list
    #[error("No files found in {0}.")]
    NoFilesFound(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding error
    #[error("Text encoding error in {0}: file is not valid UTF-8")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for docqa_core::DocQaError {
    fn from(err: ParserError) -> Self {
        docqa_core::DocQaError::Data(err.to_string())
    }
}

// ============================================================================
// Extensions
// ============================================================================

/// Normalize an extension to lowercase with a leading dot (".txt")
pub fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim().trim_start_matches('.').to_lowercase())
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for document parsers
pub trait DocumentParser: Send + Sync {
    /// Parse a document from a file path
    fn parse(&self, path: &Path) -> Result<Document>;
}

/// Reads the whole file as one UTF-8 document, without any markup handling
pub struct FlatTextParser;

impl DocumentParser for FlatTextParser {
    fn parse(&self, path: &Path) -> Result<Document> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let text = String::from_utf8(bytes)
            .map_err(|_| ParserError::EncodingError(path.display().to_string()))?;

        Ok(Document::new(text).with_metadata(file_metadata(path)))
    }
}

/// Collect file-level metadata. Filesystem errors leave fields at defaults.
fn file_metadata(path: &Path) -> DocumentMetadata {
    let fs_meta = std::fs::metadata(path).ok();

    DocumentMetadata {
        file_path: path.display().to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_type: path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default(),
        file_size: fs_meta.as_ref().map(|m| m.len()).unwrap_or(0),
        last_modified: fs_meta
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from),
        extra: Default::default(),
    }
}

// ============================================================================
// Tests
// ============================================================================
