//! In-memory vector index
//!
//! Stores one node per document chunk together with its L2-normalized
//! embedding in a single matrix, so retrieval is one matrix-vector product.
//! The index is immutable once built.
//!
//! Author: hephaex@gmail.com

use crate::embedding::EmbeddingClient;
use crate::Node;
use docqa_core::{DocQaError, Document, Result, SourceNode};
use docqa_parser::{chunk_document, ChunkConfig};
use ndarray::{Array1, Array2, ArrayView1};
use std::cmp::Ordering;

/// Build-once, read-only vector index with cosine similarity retrieval
#[derive(Debug, Clone)]
pub struct VectorStoreIndex {
    nodes: Vec<Node>,
    /// One normalized embedding per row, aligned with `nodes`
    embeddings: Array2<f32>,
}

impl VectorStoreIndex {
    /// Build an index from already embedded nodes.
    pub fn from_embedded(nodes: Vec<Node>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if nodes.len() != embeddings.len() {
            return Err(DocQaError::Search(format!(
                "Got {} embeddings for {} nodes",
                embeddings.len(),
                nodes.len()
            )));
        }

        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        let mut matrix = Array2::<f32>::zeros((embeddings.len(), dimension));

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(DocQaError::Search(format!(
                    "Embedding {i} has dimension {}, expected {dimension}",
                    embedding.len()
                )));
            }
            let row = normalize(ArrayView1::from(embedding.as_slice()));
            matrix.row_mut(i).assign(&row);
        }

        Ok(Self {
            nodes,
            embeddings: matrix,
        })
    }

    /// Chunk, embed and index a set of documents.
    ///
    /// Embedding requests are sent `batch_size` chunks at a time; progress is
    /// logged after each batch.
    pub async fn from_documents(
        documents: &[Document],
        chunk_config: &ChunkConfig,
        embedder: &dyn EmbeddingClient,
        batch_size: usize,
    ) -> Result<Self> {
        let nodes: Vec<Node> = documents
            .iter()
            .flat_map(|doc| {
                chunk_document(doc, chunk_config)
                    .into_iter()
                    .map(move |chunk| Node::from_chunk(doc, chunk))
            })
            .collect();

        if nodes.is_empty() {
            return Err(DocQaError::Data(
                "Documents contain no text to index.".to_string(),
            ));
        }

        tracing::info!(
            "Parsed {} documents into {} nodes",
            documents.len(),
            nodes.len()
        );

        let batch_size = batch_size.max(1);
        let total = nodes.len();
        let mut embeddings = Vec::with_capacity(total);

        for batch in nodes.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|n| n.content.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(DocQaError::Embedding(format!(
                    "Embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            embeddings.extend(vectors);
            tracing::info!(
                "Generating embeddings: {}/{} ({})",
                embeddings.len(),
                total,
                embedder.model()
            );
        }

        Self::from_embedded(nodes, embeddings)
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Retrieve the `top_k` nodes most similar to `query_embedding`.
    ///
    /// Ties keep build order, so results are deterministic.
    pub fn retrieve(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SourceNode>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimension() {
            return Err(DocQaError::Search(format!(
                "Query embedding has dimension {}, index expects {}",
                query_embedding.len(),
                self.dimension()
            )));
        }

        let query = normalize(ArrayView1::from(query_embedding));
        let scores = self.embeddings.dot(&query);

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(i, score)| self.nodes[i].to_source(score))
            .collect())
    }
}

/// L2-normalize a vector; the zero vector stays zero
fn normalize(vector: ArrayView1<'_, f32>) -> Array1<f32> {
    let norm = vector.dot(&vector).sqrt();
    if norm > 0.0 {
        vector.mapv(|v| v / norm)
    } else {
        vector.to_owned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedding;
    use docqa_core::DocumentMetadata;
    use uuid::Uuid;

    fn node(content: &str) -> Node {
        Node {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            file_name: "doc.txt".to_string(),
            chunk_index: 0,
            content: content.to_string(),
        }
    }

    fn doc(name: &str, text: &str) -> Document {
        Document::new(text).with_metadata(DocumentMetadata {
            file_name: name.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_retrieve_orders_by_cosine_similarity() {
        let index = VectorStoreIndex::from_embedded(
            vec![node("x axis"), node("y axis"), node("diagonal")],
            vec![vec![10.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        )
        .unwrap();

        let hits = index.retrieve(&[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "x axis");
        assert_eq!(hits[1].content, "diagonal");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].score <= 1.0 + 1e-6);
    }

    #[test]
    fn test_retrieve_ties_keep_build_order() {
        let index = VectorStoreIndex::from_embedded(
            vec![node("first"), node("second")],
            vec![vec![1.0, 0.0], vec![2.0, 0.0]],
        )
        .unwrap();

        let hits = index.retrieve(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "first");
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = VectorStoreIndex::from_embedded(
            vec![node("a"), node("b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, DocQaError::Search(_)));

        let index =
            VectorStoreIndex::from_embedded(vec![node("a")], vec![vec![1.0, 0.0]]).unwrap();
        assert!(index.retrieve(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_embeddings_are_normalized() {
        let index =
            VectorStoreIndex::from_embedded(vec![node("a")], vec![vec![3.0, 4.0]]).unwrap();
        let hits = index.retrieve(&[0.6, 0.8], 1).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_from_documents_retrieves_relevant_chunk() {
        let docs = vec![
            doc("rust.txt", "Rust ownership and borrowing keep memory safe."),
            doc("cooking.txt", "Bake the bread at high heat until golden."),
        ];

        let index = VectorStoreIndex::from_documents(
            &docs,
            &ChunkConfig::default(),
            &MockEmbedding::new(128),
            1,
        )
        .await
        .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 128);

        let embedder = MockEmbedding::new(128);
        let query = embedder.embed("rust ownership borrowing").await.unwrap();
        let hits = index.retrieve(&query, 1).unwrap();
        assert_eq!(hits[0].file_name, "rust.txt");
        assert_eq!(hits[0].document_id, docs[0].id);
    }

    #[tokio::test]
    async fn test_from_documents_without_text() {
        let docs = vec![doc("blank.txt", "   \n")];
        let err = VectorStoreIndex::from_documents(
            &docs,
            &ChunkConfig::default(),
            &MockEmbedding::default(),
            8,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DocQaError::Data(_)));
    }
}
