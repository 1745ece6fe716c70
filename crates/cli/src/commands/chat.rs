//! `reqsynth chat`: Generate, then revise interactively.
//!
//! Lines starting with `/` are local commands; everything else is sent to the
//! session as an instruction.

use super::setup;
use crate::SourceArgs;
use reqsynth_engine::{RevisionOutcome, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A parsed line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Exit,
    ShowDocument,
    ShowJson,
    ShowSources,
    Audit,
    Regenerate,
    Help,
    Empty,
    Instruction(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "" => ChatInput::Empty,
        "exit" | "quit" | "/exit" | "/quit" => ChatInput::Exit,
        "/doc" => ChatInput::ShowDocument,
        "/json" => ChatInput::ShowJson,
        "/sources" => ChatInput::ShowSources,
        "/audit" => ChatInput::Audit,
        "/regenerate" => ChatInput::Regenerate,
        "/help" => ChatInput::Help,
        other => ChatInput::Instruction(other),
    }
}

fn print_help() {
    println!("  Commands:");
    println!("    /doc         show the document as markdown");
    println!("    /json        show the document as JSON");
    println!("    /sources     list registered sources");
    println!("    /audit       check citations against the sources");
    println!("    /regenerate  synthesize a fresh version 1");
    println!("    exit         quit");
    println!("  Anything else is an instruction (edits mention change/update/add/remove/rewrite).");
}

pub async fn run(args: SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let (session, title) = setup::build_session(&config, &args).await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        reqsynth — Interactive Revision        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Project:   {title}");
    println!("  Sources:   {}", args.files.len());
    println!();

    eprint!("  Synthesizing...");
    match session.generate(&title).await {
        Ok(doc) => {
            eprint!("\r                 \r");
            println!(
                "  ✅ Generated \"{}\" (v{}, {} sections, {} conflicts)",
                doc.title,
                doc.version,
                doc.sections.len(),
                doc.conflicts.len()
            );
        }
        Err(e) => {
            eprint!("\r                 \r");
            println!("  ❌ Generation failed: {e}");
            println!("  Use /regenerate to try again.");
        }
    }
    println!();
    print_help();
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            ChatInput::Exit => break,
            ChatInput::Empty => continue,
            ChatInput::Help => print_help(),
            ChatInput::ShowDocument => print_or_warn(session.to_markdown().await),
            ChatInput::ShowJson => match session.export().await {
                Ok(export) => println!("{}", serde_json::to_string_pretty(&export)?),
                Err(e) => println!("  ⚠️  {e}"),
            },
            ChatInput::ShowSources => {
                for source in session.sources().await {
                    println!("  [{}] {} ({})", source.id, source.title, source.kind);
                }
            }
            ChatInput::Audit => match session.citation_audit().await {
                Ok(audit) if audit.is_clean() => {
                    println!("  ✅ {} cited source(s), none stale", audit.resolved.len())
                }
                Ok(audit) => {
                    let stale: Vec<&str> = audit.stale.iter().map(|id| id.as_str()).collect();
                    println!("  ⚠️  Stale citations: {}", stale.join(", "));
                }
                Err(e) => println!("  ⚠️  {e}"),
            },
            ChatInput::Regenerate => match session.generate(&title).await {
                Ok(doc) => println!("  ✅ Regenerated \"{}\" (v{})", doc.title, doc.version),
                Err(e) => println!("  ❌ Generation failed: {e}"),
            },
            ChatInput::Instruction(text) => instruct(&session, text).await,
        }
        println!();
    }

    println!("\n  Goodbye! 👋");
    Ok(())
}

async fn instruct(session: &Session, text: &str) {
    eprint!("  ...");
    let outcome = session.instruct(text).await;
    eprint!("\r     \r");

    let reply = session
        .conversation()
        .await
        .last()
        .map(|t| t.content.clone())
        .unwrap_or_default();
    println!("  Assistant > {reply}");

    if let RevisionOutcome::Revised { to_version, .. } = outcome {
        println!("  (document is now v{to_version}; /doc to view)");
    }
}

fn print_or_warn(result: reqsynth_core::Result<String>) {
    match result {
        Ok(text) => println!("{text}"),
        Err(e) => println!("  ⚠️  {e}"),
    }
}
