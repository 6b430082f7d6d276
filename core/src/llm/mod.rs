//! LLM client module
//!
//! The session loop only sees the [`ChatCompletion`] trait. [`LlmClient`]
//! implements it for OpenAI-compatible endpoints (OpenAI, Ollama, OpenRouter,
//! local servers).

pub mod chat;
pub mod client;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, MessageRole, Usage};
pub use client::LlmClient;

use crate::error::ProviderError;
use crate::session::SessionParams;
use async_trait::async_trait;

/// Produces the next assistant message from a transcript
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Generate one assistant reply for the full transcript
    async fn generate(
        &self,
        transcript: &[ChatMessage],
        params: &SessionParams,
    ) -> Result<String, ProviderError>;

    /// Display name used in user-facing error replies (e.g. "OpenAI")
    fn provider_name(&self) -> &str;
}

/// Connection settings for [`LlmClient`]
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Display name of the provider
    pub provider_name: String,
    /// API endpoint base URL
    pub base_url: String,
    /// API key (if required)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for rate limits, server errors and network failures
    pub max_retries: u32,
}

impl LlmConfig {
    /// Create a new LLM config
    pub fn new(provider_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        LlmConfig {
            provider_name: provider_name.into(),
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}
