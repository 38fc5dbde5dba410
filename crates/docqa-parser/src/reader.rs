//! Directory reader
//!
//! Loads every eligible file of a directory into a `DocumentSet`.

use crate::{normalize_extension, DocumentParser, FlatTextParser, ParserError, Result};
use docqa_core::DocumentSet;
use std::path::{Path, PathBuf};

/// Reads all files with an allow-listed extension from a directory.
///
/// Files are returned sorted by path so the resulting `DocumentSet` has a
/// stable order. Hidden files (leading `.`) are skipped.
pub struct DirectoryReader {
    input_dir: PathBuf,
    required_exts: Vec<String>,
    recursive: bool,
    parser: Box<dyn DocumentParser>,
}

impl DirectoryReader {
    /// Create a reader over `input_dir` that accepts any extension
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            required_exts: Vec::new(),
            recursive: false,
            parser: Box::new(FlatTextParser),
        }
    }

    /// Restrict loading to these extensions (".txt" or "txt")
    pub fn required_exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required_exts = exts
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    /// Descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// List the files that `load_data` would read.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            return Err(ParserError::DirectoryNotFound(
                self.input_dir.display().to_string(),
            ));
        }

        let mut files = Vec::new();
        let mut pending = vec![self.input_dir.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| ParserError::IoError {
                path: dir.display().to_string(),
                source: e,
            })?;

            for entry in entries {
                let entry = entry.map_err(|e| ParserError::IoError {
                    path: dir.display().to_string(),
                    source: e,
                })?;
                let path = entry.path();

                if is_hidden(&path) {
                    continue;
                }
                if path.is_dir() {
                    if self.recursive {
                        pending.push(path);
                    }
                    continue;
                }
                if path.is_file() && self.is_allowed(&path) {
                    files.push(path);
                }
            }
        }

        if files.is_empty() {
            return Err(ParserError::NoFilesFound(
                self.input_dir.display().to_string(),
            ));
        }

        files.sort();
        Ok(files)
    }

    /// Load every eligible file as one document.
    pub fn load_data(&self) -> Result<DocumentSet> {
        let files = self.list_files()?;
        tracing::debug!(
            "Loading {} files from {}",
            files.len(),
            self.input_dir.display()
        );

        files.iter().map(|path| self.parser.parse(path)).collect()
    }

    fn is_allowed(&self, path: &Path) -> bool {
        if self.required_exts.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.required_exts.contains(&normalize_extension(e)))
            .unwrap_or(false)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
