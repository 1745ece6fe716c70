//! reqsynth CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write the default config file
//! - `generate`: Synthesize a document from source files
//! - `chat`: Generate, then revise interactively
//! - `doctor`: Diagnose configuration
//! - `config`: Inspect the effective configuration

use clap::{Parser, Subcommand};
use reqsynth_core::source::SourceKind;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "reqsynth",
    about = "reqsynth — turn scattered project communications into a cited requirements document",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Options shared by every command that synthesizes a document.
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source files (plain text, already decoded)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Source kind for every file (default: inferred from the extension)
    #[arg(short, long)]
    pub kind: Option<SourceKind>,

    /// Project title (default: synthesis.project_title from config)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Override the configured model
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.reqsynth/config.toml
    Init,

    /// Synthesize a requirements document from source files
    Generate {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = commands::generate::OutputFormat::Markdown)]
        format: commands::generate::OutputFormat,

        /// Write the document to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a document, then revise it through free-text instructions
    Chat {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Diagnose configuration and provider setup
    Doctor,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Generate {
            sources,
            format,
            output,
        } => commands::generate::run(sources, format, output).await?,
        Commands::Chat { sources } => commands::chat::run(sources).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
