//! Embedding client for generating vector representations
//!
//! Supports HuggingFace text-embeddings-inference (TEI), OpenAI and Ollama
//! embedding APIs.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use docqa_core::{DocQaError, EmbeddingConfig, EmbeddingProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| DocQaError::Embedding("No embedding returned".to_string()))
    }

    /// Generate embeddings for multiple texts (batch), in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model name for logging
    fn model(&self) -> &str;
}

// ============================================================================
// TEI (HuggingFace text-embeddings-inference) Client
// ============================================================================

/// HuggingFace text-embeddings-inference client
pub struct TeiEmbedding {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct TeiEmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

impl TeiEmbedding {
    /// Create a new TEI client for a server already serving `model`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.effective_url(), config.model.clone())
    }
}

#[async_trait]
impl EmbeddingClient for TeiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&TeiEmbedRequest {
                inputs: texts,
                truncate: true,
            })
            .send()
            .await
            .map_err(|e| DocQaError::Embedding(format!("TEI embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocQaError::Embedding(format!(
                "TEI embedding error: {error_text}"
            )));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| DocQaError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        if embeddings.len() != texts.len() {
            return Err(DocQaError::Embedding(format!(
                "TEI returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from config, reading the API key from the environment
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DocQaError::Config(format!(
                    "{} is not set in the environment variables.",
                    config.api_key_env
                ))
            })?;

        Ok(Self::new(api_key, config.model.clone()).with_base_url(config.effective_url()))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocQaError::Embedding(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocQaError::Embedding(format!(
                "OpenAI embedding error: {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        // Sort by index and extract embeddings
        let mut embeddings = result.data;
        embeddings.sort_by_key(|e| e.index);

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.effective_url(), config.model.clone())
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| DocQaError::Embedding(format!("Ollama embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocQaError::Embedding(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama doesn't have native batch embedding, so we process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Mock Client
// ============================================================================

/// Deterministic bag-of-words embedding built from hashed words.
///
/// Texts sharing words end up close together, which is enough to exercise
/// retrieval without a model server.
#[cfg(any(test, feature = "mock"))]
pub struct MockEmbedding {
    dimension: usize,
}

#[cfg(any(test, feature = "mock"))]
impl MockEmbedding {
    /// Create a mock client producing vectors of `dimension` components
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let slot = (hasher.finish() % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl EmbeddingClient for MockEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        EmbeddingProvider::Tei => Ok(Box::new(TeiEmbedding::from_config(config))),
        EmbeddingProvider::OpenAI => Ok(Box::new(OpenAiEmbedding::from_config(config)?)),
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_openai_from_config_requires_key() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::OpenAI,
            api_key_env: "DOCQA_TEST_EMBED_KEY_NEVER_SET".to_string(),
            ..Default::default()
        };

        let err = create_embedding_client(&config).err().unwrap();
        assert!(matches!(err, DocQaError::Config(ref msg)
            if msg == "DOCQA_TEST_EMBED_KEY_NEVER_SET is not set in the environment variables."));
    }

    #[tokio::test]
    async fn test_tei_embed_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_partial_json(serde_json::json!({"inputs": ["a", "b"]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([[1.0, 0.0], [0.0, 1.0]])),
            )
            .mount(&server)
            .await;

        let client = TeiEmbedding::new(server.uri(), "BAAI/bge-small-en-v1.5");
        let vectors = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_tei_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let client = TeiEmbedding::new(server.uri(), "BAAI/bge-small-en-v1.5");
        let err = client.embed("hello").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("model loading"));
    }

    #[tokio::test]
    async fn test_openai_sorts_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.0, 2.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiEmbedding::new("sk-test", "text-embedding-3-small")
            .with_base_url(server.uri());
        let vectors = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 2.0]]);
    }

    #[tokio::test]
    async fn test_ollama_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [0.5, 0.5]})),
            )
            .mount(&server)
            .await;

        let client = OllamaEmbedding::new(server.uri(), "nomic-embed-text");
        let vectors = client
            .embed_batch(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic_and_normalized() {
        let client = MockEmbedding::new(32);
        let a = client.embed("Rust ownership rules").await.unwrap();
        let b = client.embed("Rust ownership rules").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
