//! Vector retrieval query engine
//!
//! Answers a query by retrieving the most similar chunks from the index and
//! asking the LLM to synthesize an answer from them.
//!
//! Author: hephaex@gmail.com

use crate::prompt::PromptBuilder;
use async_trait::async_trait;
use docqa_core::{LlmClient, QueryEngine, QueryResult, Result};
use docqa_vector::{EmbeddingClient, VectorStoreIndex};
use std::sync::Arc;
use std::time::Instant;

/// Retrieval settings for a query engine
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of nodes retrieved per query
    pub similarity_top_k: usize,

    /// Maximum context length for the LLM prompt (in characters)
    pub max_context_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 2,
            max_context_length: 8000,
        }
    }
}

impl From<&docqa_core::IndexConfig> for RetrievalConfig {
    fn from(config: &docqa_core::IndexConfig) -> Self {
        Self {
            similarity_top_k: config.similarity_top_k,
            max_context_length: config.max_context_length,
        }
    }
}

/// Query engine over a built `VectorStoreIndex`.
///
/// Holds only shared, immutable state, so engines are cheap to create and
/// safe to use from many requests at once.
pub struct VectorQueryEngine {
    index: Arc<VectorStoreIndex>,
    embedder: Arc<dyn EmbeddingClient>,
    llm_client: Arc<dyn LlmClient>,
    config: RetrievalConfig,
}

impl VectorQueryEngine {
    /// Create a new engine
    pub fn new(
        index: Arc<VectorStoreIndex>,
        embedder: Arc<dyn EmbeddingClient>,
        llm_client: Arc<dyn LlmClient>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            llm_client,
            config,
        }
    }
}

#[async_trait]
impl QueryEngine for VectorQueryEngine {
    async fn query(&self, text: &str) -> Result<QueryResult> {
        let start_time = Instant::now();

        let query_embedding = self.embedder.embed(text).await?;
        let sources = self
            .index
            .retrieve(&query_embedding, self.config.similarity_top_k)?;
        tracing::debug!("Retrieved {} nodes", sources.len());

        let prompt = PromptBuilder::new()
            .max_context_length(self.config.max_context_length)
            .add_sources(&sources)
            .question(text)
            .build();

        tracing::debug!(
            "Calling {} with prompt length: {} chars",
            self.llm_client.model(),
            prompt.len()
        );
        let response = self.llm_client.generate(&prompt).await?;
        tracing::debug!(
            "Query answered in {} ms",
            start_time.elapsed().as_millis()
        );

        Ok(QueryResult::new(response).with_sources(sources))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{DocQaError, Document, DocumentMetadata};
    use docqa_parser::ChunkConfig;
    use docqa_vector::MockEmbedding;
    use std::sync::Mutex;

    /// Answers with the context line of the prompt that names a file
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let file = prompt
                .lines()
                .find(|l| l.starts_with("file_name: "))
                .unwrap_or("none");
            Ok(format!("answer from {file}"))
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(DocQaError::Llm("rate limited".to_string()))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    async fn build_index(embedder: &MockEmbedding) -> Arc<VectorStoreIndex> {
        let docs: Vec<Document> = [
            ("tea.txt", "Green tea is steeped at a low temperature."),
            ("trains.txt", "Express trains stop only at major stations."),
        ]
        .into_iter()
        .map(|(name, text)| {
            Document::new(text).with_metadata(DocumentMetadata {
                file_name: name.to_string(),
                ..Default::default()
            })
        })
        .collect();

        Arc::new(
            VectorStoreIndex::from_documents(&docs, &ChunkConfig::default(), embedder, 16)
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_query_uses_most_similar_chunk() {
        let embedder = MockEmbedding::default();
        let index = build_index(&embedder).await;
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
        });

        let engine = VectorQueryEngine::new(
            index,
            Arc::new(embedder),
            llm.clone(),
            RetrievalConfig {
                similarity_top_k: 1,
                max_context_length: 8000,
            },
        );

        let result = engine.query("express trains stations").await.unwrap();
        assert_eq!(result.response, "answer from file_name: trains.txt");
        assert_eq!(result.source_nodes.len(), 1);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Query: express trains stations\nAnswer: "));
        assert!(!prompts[0].contains("Green tea"));
    }

    #[tokio::test]
    async fn test_repeated_queries_are_identical() {
        let embedder = MockEmbedding::default();
        let index = build_index(&embedder).await;
        let engine = VectorQueryEngine::new(
            index,
            Arc::new(embedder),
            Arc::new(RecordingLlm {
                prompts: Mutex::new(Vec::new()),
            }),
            RetrievalConfig::default(),
        );

        let first = engine.query("green tea").await.unwrap();
        let second = engine.query("green tea").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let embedder = MockEmbedding::default();
        let index = build_index(&embedder).await;
        let engine = VectorQueryEngine::new(
            index,
            Arc::new(embedder),
            Arc::new(FailingLlm),
            RetrievalConfig::default(),
        );

        let err = engine.query("green tea").await.unwrap_err();
        assert!(err.is_upstream());
    }
}
