//! Provider router: selects the correct generative provider based on config.
//!
//! Handles provider creation and wraps the default provider in a fallback
//! chain when `runtime.fallback_providers` is configured.

use crate::fallback::FallbackProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use reqsynth_config::AppConfig;
use reqsynth_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routes generation requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The default provider, chained with any configured fallbacks.
    ///
    /// Unknown fallback names are skipped.
    pub fn active(&self, config: &AppConfig) -> Option<Arc<dyn Provider>> {
        let primary = self.default()?;
        if config.runtime.fallback_providers.is_empty() {
            return Some(primary);
        }

        let timeout = config.request_timeout();
        let mut chain = FallbackProvider::new("fallback").add(primary, timeout);
        for name in &config.runtime.fallback_providers {
            if name == &self.default_provider {
                continue;
            }
            match self.get(name) {
                Some(p) => chain = chain.add(p, timeout),
                None => debug!(provider = %name, "Skipping unknown fallback provider"),
            }
        }

        debug!(members = ?chain.members(), "Fallback chain ready");
        Some(Arc::new(chain))
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// The model to request: a provider-level override wins over `default_model`.
pub fn resolve_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        router.register(
            name.clone(),
            make_provider(name, &api_key, provider_config.api_url.as_deref()),
        );
    }

    // Ensure the default provider and fallbacks exist (even if not explicitly configured)
    let implicit = std::iter::once(&config.default_provider).chain(&config.runtime.fallback_providers);
    for name in implicit {
        if router.get(name).is_none() {
            let api_key = config.api_key.clone().unwrap_or_default();
            router.register(name.clone(), make_provider(name, &api_key, None));
        }
    }

    router
}

fn make_provider(name: &str, api_key: &str, api_url: Option<&str>) -> Arc<dyn Provider> {
    if name == "gemini" {
        let mut p = GeminiProvider::new(api_key);
        if let Some(url) = api_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = api_url
            .map(String::from)
            .unwrap_or_else(|| default_base_url(name));
        Arc::new(OpenAiCompatProvider::new(name, &base_url, api_key))
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqsynth_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        let provider = Arc::new(OpenAiCompatProvider::openrouter("sk-test"));
        router.register("openrouter", provider);

        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config_uses_gemini() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(router.active(&config).unwrap().name(), "gemini");
    }

    #[test]
    fn fallback_chain_wraps_default() {
        let mut config = AppConfig::default();
        config.runtime.fallback_providers = vec!["openai".into(), "missing".into()];
        let router = build_from_config(&config);

        assert_eq!(router.list(), vec!["gemini", "missing", "openai"]);
        let active = router.active(&config).unwrap();
        assert_eq!(active.name(), "fallback");
        // gemini, openai, and the implicitly registered "missing", 180s each
        assert_eq!(
            active.time_budget(config.request_timeout()),
            config.request_timeout() * 3
        );
    }

    #[test]
    fn provider_model_override() {
        let mut config = AppConfig::default();
        assert_eq!(resolve_model(&config), config.default_model);

        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: Some("gemini-2.5-flash".into()),
            },
        );
        assert_eq!(resolve_model(&config), "gemini-2.5-flash");
    }
}
