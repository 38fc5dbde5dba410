//! Index lifecycle
//!
//! `IndexProvider` owns the one retrieval index of the process. It is built
//! by `initialize()`, handed out as query engines by `get_query_engine()`,
//! and dropped again by `close()`.
//!
//! Author: hephaex@gmail.com

use crate::engine::{RetrievalConfig, VectorQueryEngine};
use crate::llm::create_llm_client;
use async_trait::async_trait;
use docqa_core::{
    AppConfig, DocQaError, DocumentSet, EmbeddingConfig, LlmClient, LlmConfig, QueryEngine,
    Result,
};
use docqa_parser::{ChunkConfig, DirectoryReader};
use docqa_vector::{create_embedding_client, EmbeddingClient, VectorStoreIndex};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

// ============================================================================
// Collaborator construction
// ============================================================================

/// Constructs the external collaborators an index needs
pub trait ClientFactory: Send + Sync {
    /// Build the LLM client. `api_key` has already been resolved.
    fn llm_client(&self, config: &LlmConfig, api_key: Option<String>)
        -> Result<Arc<dyn LlmClient>>;

    /// Build the embedding client
    fn embedding_client(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingClient>>;
}

/// Factory for the HTTP-backed provider clients
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn llm_client(
        &self,
        config: &LlmConfig,
        api_key: Option<String>,
    ) -> Result<Arc<dyn LlmClient>> {
        create_llm_client(config, api_key).map(Arc::from)
    }

    fn embedding_client(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingClient>> {
        create_embedding_client(config).map(Arc::from)
    }
}

// ============================================================================
// Query engine access
// ============================================================================

/// Source of query engines for the HTTP layer
#[async_trait]
pub trait QueryEngineProvider: Send + Sync {
    /// A query engine over the current index, or `IndexNotInitialized`
    async fn get_query_engine(&self) -> Result<Arc<dyn QueryEngine>>;

    /// Whether an index is available
    async fn is_initialized(&self) -> bool;
}

// ============================================================================
// Index Provider
// ============================================================================

/// Everything a query engine needs, built together by `initialize()`
struct IndexHandle {
    index: Arc<VectorStoreIndex>,
    embedder: Arc<dyn EmbeddingClient>,
    llm_client: Arc<dyn LlmClient>,
}

/// Owner of the process-wide retrieval index.
///
/// Construct one in `main`, wrap it in an `Arc` and share that `Arc` with
/// every consumer.
pub struct IndexProvider {
    config: AppConfig,
    factory: Arc<dyn ClientFactory>,
    slot: RwLock<Option<Arc<IndexHandle>>>,
    /// Serializes index builds
    build_lock: Mutex<()>,
}

impl IndexProvider {
    /// Create an uninitialized provider
    pub fn new(config: AppConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            factory,
            slot: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Create a provider that talks to the configured HTTP services
    pub fn from_config(config: AppConfig) -> Self {
        Self::new(config, Arc::new(HttpClientFactory))
    }

    /// Configuration the provider builds from
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the index and make it available to query engines.
    ///
    /// Calling this again rebuilds the index and replaces the current one.
    /// On failure the slot keeps whatever it held before.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        self.build_and_store().await
    }

    /// Initialize unless an index is already available.
    ///
    /// Concurrent callers wait for the first build instead of starting
    /// their own.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if self.slot.read().await.is_some() {
            return Ok(());
        }

        let _guard = self.build_lock.lock().await;
        if self.slot.read().await.is_some() {
            return Ok(());
        }
        self.build_and_store().await
    }

    /// Drop the index. Engines handed out earlier keep working until they
    /// are dropped; new requests fail with `IndexNotInitialized`.
    pub async fn close(&self) {
        if self.slot.write().await.take().is_some() {
            tracing::info!("Index closed");
        }
    }

    /// Number of nodes in the current index
    pub async fn node_count(&self) -> Option<usize> {
        self.slot.read().await.as_ref().map(|h| h.index.len())
    }

    async fn build_and_store(&self) -> Result<()> {
        let handle = self.build().await?;
        *self.slot.write().await = Some(Arc::new(handle));
        Ok(())
    }

    async fn build(&self) -> Result<IndexHandle> {
        let llm_client = self.configure_llm()?;
        let embedder = self.configure_embedding()?;
        let documents = self.load_documents().await?;

        let chunk_config =
            ChunkConfig::new(self.config.index.chunk_size, self.config.index.chunk_overlap);
        let index = VectorStoreIndex::from_documents(
            &documents,
            &chunk_config,
            embedder.as_ref(),
            self.config.embedding.batch_size,
        )
        .await?;

        tracing::info!(
            "Index initialized: {} documents, {} nodes, llm={}, embedding={}",
            documents.len(),
            index.len(),
            llm_client.model(),
            embedder.model()
        );

        Ok(IndexHandle {
            index: Arc::new(index),
            embedder,
            llm_client,
        })
    }

    /// The credential is checked before any client is constructed.
    fn configure_llm(&self) -> Result<Arc<dyn LlmClient>> {
        let llm = &self.config.llm;
        let api_key = llm.resolve_api_key();
        if api_key.is_none() && llm.provider.requires_api_key() {
            return Err(DocQaError::Config(llm.missing_api_key_message()));
        }
        self.factory.llm_client(llm, api_key)
    }

    fn configure_embedding(&self) -> Result<Arc<dyn EmbeddingClient>> {
        self.factory.embedding_client(&self.config.embedding)
    }

    async fn load_documents(&self) -> Result<DocumentSet> {
        let data = self.config.data.clone();
        tracing::info!("Loading documents from {}", data.path.display());

        let documents = tokio::task::spawn_blocking(move || {
            DirectoryReader::new(data.path)
                .required_exts(&data.required_exts)
                .recursive(data.recursive)
                .load_data()
        })
        .await
        .map_err(|e| DocQaError::Other(e.into()))??;

        tracing::info!("Loaded {} documents", documents.len());
        Ok(documents)
    }
}

#[async_trait]
impl QueryEngineProvider for IndexProvider {
    async fn get_query_engine(&self) -> Result<Arc<dyn QueryEngine>> {
        let handle = self
            .slot
            .read()
            .await
            .clone()
            .ok_or(DocQaError::IndexNotInitialized)?;

        Ok(Arc::new(VectorQueryEngine::new(
            handle.index.clone(),
            handle.embedder.clone(),
            handle.llm_client.clone(),
            RetrievalConfig::from(&self.config.index),
        )))
    }

    async fn is_initialized(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::INDEX_NOT_INITIALIZED_ERROR;
    use docqa_vector::MockEmbedding;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let context = prompt
                .lines()
                .find(|l| l.starts_with("file_name: "))
                .unwrap_or_default();
            Ok(format!("stub answer ({context})"))
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        llm_calls: AtomicUsize,
        embedding_calls: AtomicUsize,
    }

    impl ClientFactory for CountingFactory {
        fn llm_client(
            &self,
            _config: &LlmConfig,
            _api_key: Option<String>,
        ) -> Result<Arc<dyn LlmClient>> {
            self.llm_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubLlm))
        }

        fn embedding_client(
            &self,
            _config: &EmbeddingConfig,
        ) -> Result<Arc<dyn EmbeddingClient>> {
            self.embedding_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockEmbedding::default()))
        }
    }

    /// Config whose credential lives in a variable only this test touches
    fn config(data_dir: &Path, key_var: &str, key: Option<&str>) -> AppConfig {
        match key {
            Some(value) => std::env::set_var(key_var, value),
            None => std::env::remove_var(key_var),
        }

        let mut config = AppConfig::default();
        config.llm.api_key_env = key_var.to_string();
        config.data.path = data_dir.to_path_buf();
        config
    }

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lighthouse.txt"),
            "The lighthouse keeper lights the lamp at dusk.",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("orchard.txt"),
            "Apple trees in the orchard blossom in spring.",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_collaborators() {
        let dir = data_dir();
        let factory = Arc::new(CountingFactory::default());
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_MISSING_KEY", None),
            factory.clone(),
        );

        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, DocQaError::Config(_)));
        assert_eq!(
            err.to_string(),
            "DOCQA_TEST_MISSING_KEY is not set in the environment variables."
        );
        assert!(!provider.is_initialized().await);
        assert_eq!(factory.llm_calls.load(Ordering::SeqCst), 0);
        assert_eq!(factory.embedding_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_credential_counts_as_missing() {
        let dir = data_dir();
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_EMPTY_KEY", Some("")),
            Arc::new(CountingFactory::default()),
        );

        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, DocQaError::Config(_)));
    }

    #[tokio::test]
    async fn test_query_engine_requires_initialization() {
        let dir = data_dir();
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_KEY_LIFECYCLE", Some("secret")),
            Arc::new(CountingFactory::default()),
        );

        let err = provider.get_query_engine().await.err().unwrap();
        assert!(matches!(err, DocQaError::IndexNotInitialized));
        assert_eq!(err.to_string(), INDEX_NOT_INITIALIZED_ERROR);

        provider.initialize().await.unwrap();
        assert!(provider.is_initialized().await);
        assert_eq!(provider.node_count().await, Some(2));

        let engine = provider.get_query_engine().await.unwrap();
        let result = engine.query("lighthouse lamp").await.unwrap();
        assert_eq!(result.response, "stub answer (file_name: lighthouse.txt)");

        provider.close().await;
        assert!(provider.get_query_engine().await.is_err());
        // Engines obtained before close keep working
        assert!(engine.query("orchard").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_data_directory() {
        let dir = data_dir();
        let missing = dir.path().join("nope");
        let provider = IndexProvider::new(
            config(&missing, "DOCQA_TEST_KEY_NO_DIR", Some("secret")),
            Arc::new(CountingFactory::default()),
        );

        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, DocQaError::Data(_)));
        assert!(err.to_string().ends_with("does not exist."));
        assert!(!provider.is_initialized().await);
    }

    #[tokio::test]
    async fn test_no_eligible_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "# not a txt file").unwrap();
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_KEY_NO_DOCS", Some("secret")),
            Arc::new(CountingFactory::default()),
        );

        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, DocQaError::Data(_)));
        assert!(err.to_string().starts_with("No files found in"));
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_index() {
        let dir = data_dir();
        let factory = Arc::new(CountingFactory::default());
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_KEY_REBUILD", Some("secret")),
            factory.clone(),
        );

        provider.initialize().await.unwrap();
        std::fs::write(dir.path().join("river.txt"), "The river floods in autumn.").unwrap();
        provider.initialize().await.unwrap();

        assert_eq!(provider.node_count().await, Some(3));
        assert_eq!(factory.embedding_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ensure_initialized_builds_once() {
        let dir = data_dir();
        let factory = Arc::new(CountingFactory::default());
        let provider = Arc::new(IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_KEY_CONCURRENT", Some("secret")),
            factory.clone(),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.ensure_initialized().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(provider.is_initialized().await);
        assert_eq!(factory.embedding_calls.load(Ordering::SeqCst), 1);
        assert_eq!(factory.llm_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_query_same_answer() {
        let dir = data_dir();
        let provider = IndexProvider::new(
            config(dir.path(), "DOCQA_TEST_KEY_DETERMINISTIC", Some("secret")),
            Arc::new(CountingFactory::default()),
        );
        provider.initialize().await.unwrap();

        let first = provider
            .get_query_engine()
            .await
            .unwrap()
            .query("apple blossom")
            .await
            .unwrap();
        let second = provider
            .get_query_engine()
            .await
            .unwrap()
            .query("apple blossom")
            .await
            .unwrap();
        assert_eq!(first.response, second.response);
        assert_eq!(first.source_nodes, second.source_nodes);
    }
}
