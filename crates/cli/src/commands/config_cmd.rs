//! `reqsynth config`: Inspect configuration.

use reqsynth_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("🔍 Validating config: {}", config_path.display());

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config is valid");
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Excerpt:   {} chars", config.revision.source_excerpt_chars);
            println!("   Fallbacks: {}", config.runtime.fallback_providers.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Print the effective configuration with secrets redacted.
pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render_redacted(&config)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut redacted = config.clone();
    if redacted.api_key.is_some() {
        redacted.api_key = Some("[REDACTED]".into());
    }
    for provider in redacted.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }
    toml::to_string_pretty(&redacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn show_never_prints_keys() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret-123".into());
        let rendered = render_redacted(&config).unwrap();
        assert!(!rendered.contains("sk-secret-123"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
