//! `reqsynth doctor`: Diagnose configuration and provider setup.

use reqsynth_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 reqsynth Doctor — Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file — defaults in use (run `reqsynth init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", reqsynth_providers::resolve_model(&config));
    println!("  Timeout:   {}s", config.runtime.request_timeout_secs);

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set GEMINI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let router = reqsynth_providers::build_from_config(&config);
    for name in &config.runtime.fallback_providers {
        if router.get(name).is_none() {
            println!("  ⚠️  Fallback provider '{name}' could not be built");
            issues += 1;
        }
    }

    if let Some(provider) = router.active(&config) {
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' responded with an error", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No default provider could be built");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
