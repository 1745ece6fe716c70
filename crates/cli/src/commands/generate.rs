//! `reqsynth generate`: Synthesize a document from source files.

use super::setup;
use crate::SourceArgs;
use std::path::PathBuf;

/// How the generated document is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `{title, sections, conflicts}` as pretty JSON
    Json,
    /// Headings, conflicts block, sections
    Markdown,
}

pub async fn run(
    args: SourceArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let (session, title) = setup::build_session(&config, &args).await?;

    eprintln!(
        "  Synthesizing \"{title}\" from {} source(s)...",
        args.files.len()
    );
    session.generate(&title).await?;

    let audit = session.citation_audit().await?;
    if !audit.is_clean() {
        let stale: Vec<&str> = audit.stale.iter().map(|id| id.as_str()).collect();
        eprintln!("  ⚠️  Citations to unknown sources: {}", stale.join(", "));
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&session.export().await?)?,
        OutputFormat::Markdown => session.to_markdown().await?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            eprintln!("  ✅ Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
