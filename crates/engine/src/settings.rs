//! Request settings shared by the synthesis and revision engines.

use reqsynth_config::AppConfig;
use reqsynth_core::provider::ProviderRequest;
use std::time::Duration;

/// Everything the engines need to shape a provider request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub synthesis_thinking_budget: Option<u32>,
    pub revision_thinking_budget: Option<u32>,
    pub source_excerpt_chars: usize,
    pub query_history_turns: usize,
    pub request_timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), None)
    }
}

impl GenerationSettings {
    /// Derive settings from the application config.
    ///
    /// `model` overrides `default_model` when given. A thinking budget of zero
    /// disables the budget entirely.
    pub fn from_config(config: &AppConfig, model: Option<String>) -> Self {
        let budget = |b: u32| (b > 0).then_some(b);
        Self {
            model: model.unwrap_or_else(|| config.default_model.clone()),
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
            synthesis_thinking_budget: budget(config.synthesis.thinking_budget),
            revision_thinking_budget: budget(config.revision.thinking_budget),
            source_excerpt_chars: config.revision.source_excerpt_chars,
            query_history_turns: config.revision.query_history_turns,
            request_timeout: config.request_timeout(),
        }
    }

    /// A base request carrying the model and sampling settings.
    pub fn request(&self, prompt: impl Into<String>) -> ProviderRequest {
        ProviderRequest::new(&self.model, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}
