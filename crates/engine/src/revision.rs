//! Instruction handling against the live document.
//!
//! State is derived from whether a document exists:
//!
//! | State | Intent | Provider call | Reply role | Document |
//! |-------|--------|---------------|------------|----------|
//! | NoDocument | any | none | system | unchanged |
//! | Ready | Edit | structured | assistant | replaced on success |
//! | Ready | Query | text | assistant | unchanged |
//!
//! Every instruction appends one user turn and one reply turn, and nothing is
//! written until the provider call has settled.

use crate::call::with_timeout;
use crate::context::ContextAssembler;
use crate::intent::{Intent, IntentClassifier};
use crate::settings::GenerationSettings;
use chrono::Utc;
use reqsynth_core::conversation::{ConversationLog, TurnRole};
use reqsynth_core::document::Document;
use reqsynth_core::error::Result;
use reqsynth_core::provider::Provider;
use reqsynth_core::schema::{DocumentDraft, parse_draft};
use reqsynth_core::source::Source;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply when an instruction arrives before any document exists.
pub const NO_DOCUMENT_REPLY: &str =
    "Please generate a requirements document first by adding sources and running generate.";

/// Reply after a successful edit.
pub const EDIT_CONFIRMATION: &str = "I've updated the document as requested.";

/// Reply after any failed edit or query.
pub const APOLOGY: &str = "Sorry, I encountered an error processing your request.";

/// Whether instructions can be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionState {
    NoDocument,
    Ready,
}

impl RevisionState {
    pub fn of(document: Option<&Document>) -> Self {
        match document {
            Some(_) => Self::Ready,
            None => Self::NoDocument,
        }
    }
}

/// What happened to one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionOutcome {
    /// No document yet; the guidance reply was logged
    Declined,
    /// The edit produced a new live version
    Revised { from_version: u64, to_version: u64 },
    /// The edit failed; the live document is unchanged
    RevisionFailed { version: u64, reason: String },
    /// The question was answered
    Answered { version: u64 },
    /// The question could not be answered
    QueryFailed { version: u64, reason: String },
}

impl RevisionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Revised { .. } | Self::Answered { .. })
    }
}

/// Applies edit and query instructions to a document.
pub struct RevisionEngine {
    provider: Arc<dyn Provider>,
    assembler: ContextAssembler,
    classifier: IntentClassifier,
    settings: GenerationSettings,
}

impl RevisionEngine {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self {
            provider,
            assembler: ContextAssembler::new(
                settings.source_excerpt_chars,
                settings.query_history_turns,
            ),
            classifier: IntentClassifier::default(),
            settings,
        }
    }

    /// Replace the intent classifier.
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Handle one instruction. Never fails: errors become apologetic replies.
    ///
    /// `document` is replaced only after a successful edit; `log` gains
    /// exactly two turns.
    pub async fn instruct(
        &self,
        document: &mut Option<Document>,
        sources: &[Source],
        log: &mut ConversationLog,
        instruction: &str,
    ) -> RevisionOutcome {
        let received_at = Utc::now();

        let Some(current) = document.as_ref() else {
            debug!("Instruction declined: no document");
            log.append_at(TurnRole::User, instruction, received_at);
            log.append(TurnRole::System, NO_DOCUMENT_REPLY);
            return RevisionOutcome::Declined;
        };

        let version = current.version;
        let intent = self.classifier.classify(instruction);
        debug!(?intent, version, "Instruction classified");

        let (reply, outcome) = match intent {
            Intent::Edit => match self.edit(current, sources, instruction).await {
                Ok(revised) => {
                    let to_version = revised.version;
                    info!(from_version = version, to_version, "Document revised");
                    *document = Some(revised);
                    (
                        EDIT_CONFIRMATION.to_string(),
                        RevisionOutcome::Revised {
                            from_version: version,
                            to_version,
                        },
                    )
                }
                Err(e) => {
                    warn!(error = %e, version, "Edit failed; document unchanged");
                    (
                        APOLOGY.to_string(),
                        RevisionOutcome::RevisionFailed {
                            version,
                            reason: e.to_string(),
                        },
                    )
                }
            },
            Intent::Query => match self.answer(current, log, instruction).await {
                Ok(answer) => (answer, RevisionOutcome::Answered { version }),
                Err(e) => {
                    warn!(error = %e, version, "Query failed");
                    (
                        APOLOGY.to_string(),
                        RevisionOutcome::QueryFailed {
                            version,
                            reason: e.to_string(),
                        },
                    )
                }
            },
        };

        log.append_at(TurnRole::User, instruction, received_at);
        log.append(TurnRole::Assistant, reply);
        outcome
    }

    /// Produce the next version of `document`. Never reads conversation history.
    async fn edit(
        &self,
        document: &Document,
        sources: &[Source],
        instruction: &str,
    ) -> Result<Document> {
        let assembled = self.assembler.revision(document, sources, instruction)?;
        debug!(
            sources = assembled.metadata.sources_included,
            truncated = assembled.metadata.sources_truncated,
            estimated_tokens = assembled.metadata.estimated_tokens,
            "Revision prompt assembled"
        );

        let request = self
            .settings
            .request(assembled.prompt)
            .with_thinking_budget(self.settings.revision_thinking_budget);

        let response = with_timeout(
            self.provider.time_budget(self.settings.request_timeout),
            self.provider
                .structured_generate(request, DocumentDraft::response_schema()),
        )
        .await?;

        let draft = parse_draft(&response.into_content()?)?;
        Ok(document.revise(draft))
    }

    /// Answer a question about `document` without touching it.
    async fn answer(
        &self,
        document: &Document,
        log: &ConversationLog,
        question: &str,
    ) -> Result<String> {
        let assembled = self.assembler.query(document, log.all(), question)?;
        debug!(
            turns = assembled.metadata.turns_included,
            history_tokens = assembled.metadata.history_tokens,
            estimated_tokens = assembled.metadata.estimated_tokens,
            "Query prompt assembled"
        );

        let request = self.settings.request(assembled.prompt);
        let response = with_timeout(
            self.provider.time_budget(self.settings.request_timeout),
            self.provider.text_generate(request),
        )
        .await?;

        Ok(response.into_content()?.trim().to_string())
    }
}
