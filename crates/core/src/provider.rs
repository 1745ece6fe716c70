//! Provider trait: the abstraction over generative text backends.
//!
//! A Provider takes a prompt and returns text. When the request carries a
//! [`ResponseSchema`] the provider asks its backend for JSON matching it, but
//! the returned text is still untrusted: callers validate it themselves.
//!
//! Implementations: OpenAI-compatible endpoints, Gemini, fallback chains.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ProviderError;

/// A named JSON Schema the response should follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemini-2.5-pro", "gpt-4o")
    pub model: String,

    /// The full prompt text
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Structured-output contract; `None` for free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<ResponseSchema>,

    /// Reasoning budget for providers that support it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    /// A free-text request with default sampling settings.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
            response_schema: None,
            thinking_budget: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_thinking_budget(mut self, budget: Option<u32>) -> Self {
        self.thinking_budget = budget;
        self
    }

    pub fn is_structured(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text (JSON text for structured requests)
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    /// The content, or `EmptyResponse` when the provider produced nothing.
    pub fn into_content(self) -> Result<String, ProviderError> {
        if self.content.trim().is_empty() {
            Err(ProviderError::EmptyResponse)
        } else {
            Ok(self.content)
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The engines call `structured_generate()` or `text_generate()` without knowing
/// which backend is in use. Implementors only need `complete()`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Request output constrained to `schema`. The result is still unvalidated text.
    async fn structured_generate(
        &self,
        mut request: ProviderRequest,
        schema: ResponseSchema,
    ) -> Result<ProviderResponse, ProviderError> {
        request.response_schema = Some(schema);
        self.complete(request).await
    }

    /// Request free text.
    async fn text_generate(
        &self,
        mut request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        request.response_schema = None;
        self.complete(request).await
    }

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    /// Wall-clock allowance for one request, given the caller's per-call limit.
    ///
    /// Providers that make several attempts under their own limits return the
    /// total those attempts may take.
    fn time_budget(&self, per_call: Duration) -> Duration {
        per_call
    }
}
