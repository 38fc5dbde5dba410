//! DocQA RAG - Retrieval-Augmented Generation
//!
//! This crate turns a directory of documents into answers:
//! - `IndexProvider` builds the vector index once and owns it
//! - `VectorQueryEngine` retrieves similar chunks and asks the LLM
//! - LLM clients for Groq/OpenAI-compatible APIs and Ollama
//!
//! Author: hephaex@gmail.com

pub mod engine;
pub mod llm;
pub mod prompt;
pub mod provider;

pub use engine::{RetrievalConfig, VectorQueryEngine};
pub use llm::{create_llm_client, OllamaClient, OpenAiCompatibleClient};
pub use prompt::PromptBuilder;
pub use provider::{ClientFactory, HttpClientFactory, IndexProvider, QueryEngineProvider};
