//! DocQA Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the DocQA service:
//! - Common error types
//! - Documents loaded from the data directory
//! - Query results returned by query engines
//! - Shared traits for the LLM collaborator and query engines
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DataConfig, EmbeddingConfig, EmbeddingProvider, IndexConfig,
    LlmConfig, LlmProvider, LoggingConfig, ServerConfig, DEFAULT_LOG_FILTER,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Message used when a query engine is requested before the index is built.
pub const INDEX_NOT_INITIALIZED_ERROR: &str = "Index is not initialized.";

/// Core error types for DocQA operations
#[derive(Error, Debug)]
pub enum DocQaError {
    /// Missing or invalid configuration, e.g. an absent credential
    #[error("{0}")]
    Config(String),

    /// No loadable documents, or a document could not be read
    #[error("{0}")]
    Data(String),

    /// A query engine was requested before `initialize()` completed
    #[error("Index is not initialized.")]
    IndexNotInitialized,

    /// Client input rejected before any processing
    #[error("{0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocQaError {
    /// Whether the error originated in an external collaborator
    /// (embedding provider, LLM provider or the vector index).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Llm(_) | Self::Search(_))
    }
}

pub type Result<T> = std::result::Result<T, DocQaError>;

// ============================================================================
// Document Models
// ============================================================================

/// File-level metadata attached to a loaded document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path the document was read from
    pub file_path: String,

    /// File name without directories
    pub file_name: String,

    /// Lowercase extension, including the leading dot (".txt")
    pub file_type: String,

    /// File size in bytes
    pub file_size: u64,

    /// Last modification time, when the filesystem reports one
    pub last_modified: Option<DateTime<Utc>>,

    /// Additional metadata (custom fields)
    pub extra: HashMap<String, serde_json::Value>,
}

/// A plain-text document loaded at initialization time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: Uuid,

    /// Full text content
    pub text: String,

    /// File-level metadata
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a new document with empty metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The ordered collection of documents an index is built from
pub type DocumentSet = Vec<Document>;

// ============================================================================
// Query Types
// ============================================================================

/// A retrieved chunk that contributed context to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Node identifier inside the index
    pub node_id: Uuid,

    /// Document the chunk was taken from
    pub document_id: Uuid,

    /// Source file name
    pub file_name: String,

    /// Chunk text
    pub content: String,

    /// Cosine similarity to the query (higher is better)
    pub score: f32,
}

/// Answer produced by a query engine for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Synthesized answer text
    pub response: String,

    /// Retrieved context, most similar first
    pub source_nodes: Vec<SourceNode>,
}

impl QueryResult {
    /// Create a result with no source nodes
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            source_nodes: Vec::new(),
        }
    }

    /// Attach retrieved source nodes
    pub fn with_sources(mut self, source_nodes: Vec<SourceNode>) -> Self {
        self.source_nodes = source_nodes;
        self
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name for logging
    fn model(&self) -> &str;
}

/// A handle that answers free-text queries.
///
/// This is the only capability the HTTP layer depends on, so any retrieval
/// backend can be substituted without touching the handlers.
#[async_trait::async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer a query
    async fn query(&self, text: &str) -> Result<QueryResult>;
}

// ============================================================================
// Tests
// ============================================================================
