//! Configuration loading, validation, and management for reqsynth.
//!
//! Loads configuration from `~/.reqsynth/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.reqsynth/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// First-pass synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Edit/query settings
    #[serde(default)]
    pub revision: RevisionConfig,

    /// Runtime configuration (timeouts, fallbacks)
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-pro".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    8192
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("synthesis", &self.synthesis)
            .field("revision", &self.revision)
            .field("runtime", &self.runtime)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Project title used when none is given on the command line
    #[serde(default = "default_project_title")]
    pub project_title: String,

    /// Reasoning budget for first-pass synthesis (0 disables)
    #[serde(default = "default_synthesis_thinking_budget")]
    pub thinking_budget: u32,
}

fn default_project_title() -> String {
    "New Project".into()
}
fn default_synthesis_thinking_budget() -> u32 {
    4096
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            project_title: default_project_title(),
            thinking_budget: default_synthesis_thinking_budget(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionConfig {
    /// Characters of each source body included when revising
    #[serde(default = "default_source_excerpt_chars")]
    pub source_excerpt_chars: usize,

    /// Reasoning budget for edit calls (0 disables)
    #[serde(default = "default_revision_thinking_budget")]
    pub thinking_budget: u32,

    /// Recent conversation turns included as context for questions
    #[serde(default = "default_query_history_turns")]
    pub query_history_turns: usize,
}

fn default_source_excerpt_chars() -> usize {
    500
}
fn default_revision_thinking_budget() -> u32 {
    2048
}
fn default_query_history_turns() -> usize {
    10
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            source_excerpt_chars: default_source_excerpt_chars(),
            thinking_budget: default_revision_thinking_budget(),
            query_history_turns: default_query_history_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Upper bound on a single provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Providers tried in order after the default one fails
    #[serde(default)]
    pub fallback_providers: Vec<String>,
}

fn default_request_timeout_secs() -> u64 {
    180
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            fallback_providers: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.reqsynth/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `REQSYNTH_API_KEY` (highest priority)
    /// - `<PROVIDER>_API_KEY` for the selected provider (`GEMINI_API_KEY`,
    ///   `OPENAI_API_KEY`, ...), after `REQSYNTH_PROVIDER` is applied
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("REQSYNTH_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("REQSYNTH_MODEL") {
            self.default_model = model;
        }

        if self.api_key.is_none() {
            self.api_key = lookup("REQSYNTH_API_KEY")
                .or_else(|| lookup(&provider_key_var(&self.default_provider)));
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reqsynth")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.revision.source_excerpt_chars == 0 {
            return Err(ConfigError::ValidationError(
                "revision.source_excerpt_chars must be > 0".into(),
            ));
        }

        if self.runtime.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.request_timeout_secs must be > 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.runtime.fallback_providers {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "runtime.fallback_providers contains a blank name".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "runtime.fallback_providers lists '{name}' twice"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Provider call timeout.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime.request_timeout_secs)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            synthesis: SynthesisConfig::default(),
            revision: RevisionConfig::default(),
            runtime: RuntimeConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// The provider-specific key variable, e.g. `openai` -> `OPENAI_API_KEY`.
fn provider_key_var(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_ascii_uppercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.revision.source_excerpt_chars, 500);
        assert_eq!(config.synthesis.thinking_budget, 4096);
        assert_eq!(config.revision.thinking_budget, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(
            parsed.runtime.request_timeout_secs,
            config.runtime.request_timeout_secs
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_excerpt_budget_rejected() {
        let mut config = AppConfig::default();
        config.revision.source_excerpt_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "gemini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_provider = "openai"
default_model = "gpt-4o"

[revision]
source_excerpt_chars = 800

[providers.openai]
api_key = "sk-test"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.revision.source_excerpt_chars, 800);
        assert_eq!(config.revision.query_history_turns, 10);
        assert_eq!(config.synthesis.project_title, "New Project");
        assert!(config.has_api_key());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "default_temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "g-key"),
            ("OPENAI_API_KEY", "o-key"),
            ("REQSYNTH_MODEL", "gemini-2.5-flash"),
        ]
        .into_iter()
        .collect();

        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.default_model, "gemini-2.5-flash");
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn key_follows_the_selected_provider() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "g-key"),
            ("OPENAI_API_KEY", "o-key"),
            ("REQSYNTH_PROVIDER", "openai"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.api_key.as_deref(), Some("o-key"));

        // A keyless provider never borrows another provider's key.
        let mut config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|k| match k {
            "GEMINI_API_KEY" | "OPENAI_API_KEY" => env.get(k).map(|v| v.to_string()),
            _ => None,
        });
        assert!(config.api_key.is_none());
    }

    #[test]
    fn generic_key_wins_over_provider_key() {
        let env: HashMap<&str, &str> = [("REQSYNTH_API_KEY", "r-key"), ("GEMINI_API_KEY", "g-key")]
            .into_iter()
            .collect();
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("r-key"));
        assert_eq!(provider_key_var("open-router"), "OPEN_ROUTER_API_KEY");
    }

    #[test]
    fn blank_or_repeated_fallback_rejected() {
        let mut config = AppConfig::default();
        config.runtime.fallback_providers = vec!["openai".into(), " ".into()];
        assert!(config.validate().is_err());

        config.runtime.fallback_providers = vec!["openai".into(), "openai".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));

        config.runtime.fallback_providers = vec!["openai".into(), "groq".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("source_excerpt_chars"));
    }
}
