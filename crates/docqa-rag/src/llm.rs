//! LLM Client implementations
//!
//! Provides clients for OpenAI-compatible chat completion APIs (Groq,
//! OpenAI) and for a local Ollama server.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use docqa_core::{DocQaError, LlmClient, LlmConfig, LlmProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| DocQaError::Llm(format!("Failed to build HTTP client: {e}")))
}

// ============================================================================
// OpenAI-compatible Client
// ============================================================================

/// Client for chat completion APIs that follow the OpenAI wire format.
///
/// Groq exposes the same API under `https://api.groq.com/openai/v1`.
pub struct OpenAiCompatibleClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    message: Message,
    finish_reason: Option<String>,
}

impl OpenAiCompatibleClient {
    /// Create a client for the OpenAI API
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: LlmProvider::OpenAI.default_base_url().to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Create from config with an already resolved API key
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: api_key.into(),
            base_url: config.effective_base_url(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Set custom base URL (Groq or another compatible gateway)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocQaError::Llm(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocQaError::Llm(format!(
                "Completion API returned {status}: {error_text}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Llm(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DocQaError::Llm("No response generated".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.effective_base_url(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| DocQaError::Llm(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocQaError::Llm(format!("Ollama error: {error_text}")));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Llm(format!("Failed to parse Ollama response: {e}")))?;

        Ok(result.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config.
///
/// Hosted providers need `api_key`; without one this fails with the
/// configuration error naming the credential variable.
pub fn create_llm_client(
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::Groq | LlmProvider::OpenAI => {
            let api_key =
                api_key.ok_or_else(|| DocQaError::Config(config.missing_api_key_message()))?;
            Ok(Box::new(OpenAiCompatibleClient::from_config(
                config, api_key,
            )?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================
