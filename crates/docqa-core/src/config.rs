//! DocQA Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development. Credentials are never read from
//! files; only the *name* of the environment variable holding them is
//! configurable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Index build and retrieval configuration
    pub index: IndexConfig,

    /// Document source configuration
    pub data: DataConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Only keys the lookup returns a value for are applied.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // LLM
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(var) = lookup("LLM_API_KEY_ENV") {
            self.llm.api_key_env = var;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.ollama_url = url;
        }

        // Embedding
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(url) = lookup("EMBEDDING_URL") {
            self.embedding.url = Some(url);
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        // Data
        if let Some(path) = lookup("DATA_PATH") {
            self.data.path = PathBuf::from(path);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_enabled: true,
            cors_origins: vec![],
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// API base URL override (for OpenAI-compatible gateways)
    pub base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Error message reported when the credential variable is missing
    pub fn missing_api_key_message(&self) -> String {
        format!(
            "{} is not set in the environment variables.",
            self.api_key_env
        )
    }

    /// Read the API key from the environment. Empty values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Base URL for API calls, falling back to the provider default
    pub fn effective_base_url(&self) -> String {
        match self.provider {
            LlmProvider::Ollama => self.ollama_url.clone(),
            provider => self
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string()),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Groq,
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3-70b-8192".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Groq,
    OpenAI,
    Ollama,
}

impl LlmProvider {
    /// Hosted providers need a credential; a local Ollama does not
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Default API base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider to use
    pub provider: EmbeddingProvider,

    /// Server URL (TEI or Ollama) or API base URL (OpenAI);
    /// `None` uses the provider default
    pub url: Option<String>,

    /// Embedding model name
    pub model: String,

    /// Environment variable holding the API key (OpenAI only)
    pub api_key_env: String,

    /// Number of texts sent per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Tei,
            url: None,
            model: "BAAI/bge-small-en-v1.5".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 32,
        }
    }
}

impl EmbeddingConfig {
    /// URL for API calls, falling back to the provider default
    pub fn effective_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.provider.default_url().to_string())
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// HuggingFace text-embeddings-inference server
    Tei,
    Ollama,
    OpenAI,
}

impl EmbeddingProvider {
    /// Default server or API base URL
    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Tei => "http://localhost:8080",
            Self::Ollama => "http://localhost:11434",
            Self::OpenAI => "https://api.openai.com/v1",
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tei" | "huggingface" => Ok(Self::Tei),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Index build and retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Chunk size for document processing (bytes)
    pub chunk_size: usize,

    /// Chunk overlap (bytes)
    pub chunk_overlap: usize,

    /// Number of nodes retrieved per query
    pub similarity_top_k: usize,

    /// Maximum context length placed in the prompt (characters)
    pub max_context_length: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            similarity_top_k: 2,
            max_context_length: 8000,
        }
    }
}

/// Document source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory scanned for documents
    pub path: PathBuf,

    /// Allow-listed file extensions
    pub required_exts: Vec<String>,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            required_exts: vec![".txt".to_string()],
            recursive: false,
        }
    }
}

/// Filter directive used when no log level is configured
pub const DEFAULT_LOG_FILTER: &str = "docqa_api=info,docqa_rag=info,tower_http=info";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
