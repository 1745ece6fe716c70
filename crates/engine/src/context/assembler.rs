//! Context assembly: turns sources, the live document, and history into one
//! prompt string per provider call.
//!
//! Three modes:
//!
//! 1. **Full synthesis**: every source body, registry order, framed with its
//!    citation marker
//! 2. **Revision**: the current document as JSON plus truncated source
//!    excerpts and the raw instruction
//! 3. **Query**: the current document as JSON plus the recent conversation
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! prompts. No random or time-dependent logic is used.

use crate::context::token;
use reqsynth_core::citation::{format_marker, truncate_preserving_markers};
use reqsynth_core::conversation::ConversationTurn;
use reqsynth_core::document::Document;
use reqsynth_core::error::Result;
use reqsynth_core::source::Source;
use serde::{Deserialize, Serialize};

/// Sections every synthesized document is asked to contain, in display order.
pub const STANDARD_SECTIONS: [&str; 9] = [
    "Executive Summary",
    "Business Objectives",
    "Stakeholder Analysis",
    "Functional Requirements",
    "Non-Functional Requirements",
    "Assumptions & Constraints",
    "Risks",
    "Success Metrics",
    "Timeline",
];

const SOURCE_SEPARATOR: &str = "---";
const TRUNCATION_SUFFIX: &str = "...";

// ── Types ─────────────────────────────────────────────────────────────────

/// Which call shape a prompt was assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    FullSynthesis,
    Revision,
    Query,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    pub mode: AssemblyMode,
    /// Estimated tokens in the assembled prompt.
    pub estimated_tokens: usize,
    /// Sources framed into the prompt.
    pub sources_included: usize,
    /// Sources cut down to an excerpt.
    pub sources_truncated: usize,
    /// Conversation turns included (query mode only).
    pub turns_included: usize,
    /// Estimated tokens spent on those turns.
    pub history_tokens: usize,
}

/// The assembled prompt, ready for a provider request.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub prompt: String,
    pub metadata: AssemblyMetadata,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless apart from its limits; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    source_excerpt_chars: usize,
    query_history_turns: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(500, 10)
    }
}

impl ContextAssembler {
    pub fn new(source_excerpt_chars: usize, query_history_turns: usize) -> Self {
        Self {
            source_excerpt_chars,
            query_history_turns,
        }
    }

    /// Frame one source with its full body.
    pub fn frame_source(source: &Source) -> String {
        format!(
            "{} ({} - {}):\n{}\n{SOURCE_SEPARATOR}",
            format_marker(&source.id),
            source.kind.label(),
            source.title,
            source.body
        )
    }

    /// Frame one source with its body cut to the excerpt budget.
    ///
    /// Returns the framed text and whether the body was truncated.
    pub fn frame_excerpt(&self, source: &Source) -> (String, bool) {
        let (excerpt, truncated) =
            truncate_preserving_markers(&source.body, self.source_excerpt_chars);
        let suffix = if truncated { TRUNCATION_SUFFIX } else { "" };
        let framed = format!(
            "{} ({} - {}):\n{excerpt}{suffix}\n{SOURCE_SEPARATOR}",
            format_marker(&source.id),
            source.kind.label(),
            source.title,
        );
        (framed, truncated)
    }

    /// Assemble the full-synthesis prompt.
    pub fn full_synthesis(&self, sources: &[Source], project_title: &str) -> AssembledPrompt {
        let source_context = sources
            .iter()
            .map(Self::frame_source)
            .collect::<Vec<_>>()
            .join("\n");

        let section_list = STANDARD_SECTIONS
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "You are an expert Business Analyst.\n\
             Your task is to generate a comprehensive requirements document for a project named \"{project_title}\".\n\
             \n\
             Here is the raw data collected from various communication channels:\n\
             {source_context}\n\
             \n\
             Instructions:\n\
             1. Analyze the data to extract project objectives, stakeholders, functional and non-functional requirements, assumptions, and timeline.\n\
             2. Filter out irrelevant chit-chat or noise.\n\
             3. Identify any conflicting requirements and list them separately.\n\
             4. Use the [Source ID: ...] format to cite where specific requirements came from within the text.\n\
             5. Return the result in a strict JSON format matching the schema provided.\n\
             \n\
             Structure the document with these standard sections:\n\
             {section_list}\n"
        );

        AssembledPrompt {
            metadata: AssemblyMetadata {
                mode: AssemblyMode::FullSynthesis,
                estimated_tokens: token::estimate_tokens(&prompt),
                sources_included: sources.len(),
                sources_truncated: 0,
                turns_included: 0,
                history_tokens: 0,
            },
            prompt,
        }
    }

    /// Assemble the revision prompt for an edit instruction.
    ///
    /// Conversation history is deliberately absent: an edit sees only the
    /// document, the source excerpts, and the instruction.
    pub fn revision(
        &self,
        document: &Document,
        sources: &[Source],
        instruction: &str,
    ) -> Result<AssembledPrompt> {
        let document_json = document.to_context_json()?;

        let mut truncated_count = 0;
        let source_context = sources
            .iter()
            .map(|s| {
                let (framed, truncated) = self.frame_excerpt(s);
                if truncated {
                    truncated_count += 1;
                }
                framed
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "You are an expert Business Analyst.\n\
             \n\
             Current document (JSON):\n\
             {document_json}\n\
             \n\
             Available source context (truncated):\n\
             {source_context}\n\
             \n\
             User instruction: \"{instruction}\"\n\
             \n\
             Task:\n\
             Update the document based strictly on the user instruction.\n\
             - If the user asks to add a requirement, add it to the appropriate section.\n\
             - If the user asks to change the tone, rewrite the sections.\n\
             - Maintain the JSON structure.\n\
             - Keep existing citations if valid, or add new ones if information comes from the source context.\n"
        );

        Ok(AssembledPrompt {
            metadata: AssemblyMetadata {
                mode: AssemblyMode::Revision,
                estimated_tokens: token::estimate_tokens(&prompt),
                sources_included: sources.len(),
                sources_truncated: truncated_count,
                turns_included: 0,
                history_tokens: 0,
            },
            prompt,
        })
    }

    /// Assemble the prompt for a read-only question about the document.
    pub fn query(
        &self,
        document: &Document,
        history: &[ConversationTurn],
        question: &str,
    ) -> Result<AssembledPrompt> {
        let document_json = document.to_context_json()?;

        let start = history.len().saturating_sub(self.query_history_turns);
        let window = &history[start..];

        let mut prompt = format!("Context:\n{document_json}\n");
        if !window.is_empty() {
            prompt.push_str("\nRecent conversation:\n");
            for turn in window {
                prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
            }
        }
        prompt.push_str(&format!(
            "\nUser question:\n{question}\n\n\
             Answer the user's question based on the provided context. Be concise and helpful.\n"
        ));

        Ok(AssembledPrompt {
            metadata: AssemblyMetadata {
                mode: AssemblyMode::Query,
                estimated_tokens: token::estimate_tokens(&prompt),
                sources_included: 0,
                sources_truncated: 0,
                turns_included: window.len(),
                history_tokens: token::estimate_turns_tokens(window),
            },
            prompt,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
