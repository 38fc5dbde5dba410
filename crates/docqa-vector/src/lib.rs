//! DocQA Vector - Embeddings and vector index
//!
//! Provides embedding clients for the supported providers and an in-memory
//! vector index over document chunks.

pub mod embedding;
pub mod index;

pub use embedding::{
    create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding, TeiEmbedding,
};
pub use index::VectorStoreIndex;

#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedding;

use docqa_core::{Document, SourceNode};
use docqa_parser::TextChunk;
use uuid::Uuid;

/// A chunk of a document stored in the index
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Uuid,
    pub document_id: Uuid,
    pub file_name: String,
    pub chunk_index: u32,
    pub content: String,
}

impl Node {
    /// Create a node from a chunk of `doc`
    pub fn from_chunk(doc: &Document, chunk: TextChunk) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: doc.id,
            file_name: doc.metadata.file_name.clone(),
            chunk_index: chunk.index,
            content: chunk.content,
        }
    }

    /// Convert into a retrieval hit with the given similarity score
    pub fn to_source(&self, score: f32) -> SourceNode {
        SourceNode {
            node_id: self.id,
            document_id: self.document_id,
            file_name: self.file_name.clone(),
            content: self.content.clone(),
            score,
        }
    }
}
