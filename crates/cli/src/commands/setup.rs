//! Shared wiring for commands that run a session: config, provider, sources.

use crate::SourceArgs;
use reqsynth_config::AppConfig;
use reqsynth_core::source::{Source, SourceKind};
use reqsynth_engine::{GenerationSettings, Session};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Providers that run without an API key.
const KEYLESS_PROVIDERS: [&str; 2] = ["ollama", "vllm"];

/// Load config and fail early with setup hints when no key is available.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && !KEYLESS_PROVIDERS.contains(&config.default_provider.as_str()) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY   = '...'      (default provider)");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'   (with REQSYNTH_PROVIDER=openai)");
        eprintln!("    <NAME>_API_KEY   = '...'      (with REQSYNTH_PROVIDER=<name>)");
        eprintln!("    REQSYNTH_API_KEY = '...'      (any provider)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}

/// Guess a source kind from a file name.
pub fn infer_kind(path: &Path) -> SourceKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "eml" | "msg" | "mbox" => return SourceKind::Email,
        "vtt" | "srt" => return SourceKind::MeetingTranscript,
        _ => {}
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if stem.contains("transcript") || stem.contains("meeting") {
        SourceKind::MeetingTranscript
    } else if stem.contains("slack") || stem.contains("chat") {
        SourceKind::ChatThread
    } else if stem.contains("email") || stem.contains("mail") {
        SourceKind::Email
    } else if matches!(ext.as_str(), "md" | "rst" | "adoc" | "html") {
        SourceKind::Document
    } else {
        SourceKind::Note
    }
}

/// Read every file as a source. `kind` overrides inference for all files.
pub fn read_sources(
    files: &[PathBuf],
    kind: Option<SourceKind>,
) -> Result<Vec<Source>, Box<dyn std::error::Error>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let body = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let title = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("untitled")
            .to_string();
        let kind = kind.unwrap_or_else(|| infer_kind(path));
        debug!(file = %path.display(), %kind, chars = body.chars().count(), "Read source");
        sources.push(Source::new(kind, title, body));
    }
    Ok(sources)
}

/// Build a session with every source from `args` registered.
///
/// Returns the session and the project title to generate under.
pub async fn build_session(
    config: &AppConfig,
    args: &SourceArgs,
) -> Result<(Session, String), Box<dyn std::error::Error>> {
    let router = reqsynth_providers::build_from_config(config);
    let provider = router
        .active(config)
        .ok_or("No default provider configured")?;

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| reqsynth_providers::resolve_model(config));
    let settings = GenerationSettings::from_config(config, Some(model));
    info!(provider = provider.name(), model = %settings.model, "Provider ready");

    let session = Session::new(provider, settings);
    for source in read_sources(&args.files, args.kind)? {
        let title = source.title.clone();
        session
            .add(source)
            .await
            .map_err(|e| format!("Rejected source {title}: {e}"))?;
    }

    let title = args
        .title
        .clone()
        .unwrap_or_else(|| config.synthesis.project_title.clone());
    Ok((session, title))
}
