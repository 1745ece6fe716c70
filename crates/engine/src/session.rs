//! Session: one project's sources, live document, and conversation.
//!
//! All state sits behind a single `tokio::sync::Mutex`, held for the full
//! duration of every operation including provider calls. Overlapping
//! instructions therefore queue in arrival order, and an edit is always
//! computed against the document left by the previous one.

use crate::revision::{RevisionEngine, RevisionOutcome};
use crate::settings::GenerationSettings;
use crate::synthesis::SynthesisEngine;
use chrono::Utc;
use reqsynth_core::conversation::{ConversationLog, ConversationTurn};
use reqsynth_core::document::{CitationAudit, Document, DocumentExport};
use reqsynth_core::error::{Error, Result};
use reqsynth_core::event::{DomainEvent, EventBus};
use reqsynth_core::provider::Provider;
use reqsynth_core::source::{Source, SourceId, SourceKind, SourceRegistry};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::info;

#[derive(Default)]
struct SessionState {
    sources: SourceRegistry,
    document: Option<Document>,
    log: ConversationLog,
}

/// An independent synthesis-and-revision session.
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
    synthesis: SynthesisEngine,
    revision: RevisionEngine,
    events: EventBus,
}

impl Session {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: Mutex::new(SessionState::default()),
            synthesis: SynthesisEngine::new(provider.clone(), settings.clone()),
            revision: RevisionEngine::new(provider, settings),
            events: EventBus::default(),
        }
    }

    /// Replace the revision engine (e.g. to swap the intent classifier).
    pub fn with_revision_engine(mut self, revision: RevisionEngine) -> Self {
        self.revision = revision;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to this session's domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }

    /// Ingest decoded source text.
    pub async fn add_source(
        &self,
        kind: SourceKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<SourceId> {
        self.add(Source::new(kind, title, body)).await
    }

    /// Ingest a fully built source record.
    pub async fn add(&self, source: Source) -> Result<SourceId> {
        let kind = source.kind;
        let id = self.state.lock().await.sources.add(source)?;
        self.events.publish(DomainEvent::SourceAdded {
            session_id: self.id.clone(),
            source_id: id.to_string(),
            kind: kind.label().to_string(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    /// Snapshot of the registered sources in insertion order.
    pub async fn sources(&self) -> Vec<Source> {
        self.state.lock().await.sources.list().to_vec()
    }

    /// Synthesize a fresh version-1 document from every registered source.
    ///
    /// Calling this again regenerates from scratch and replaces the live
    /// document. On failure the previous document (if any) stays live.
    pub async fn generate(&self, project_title: &str) -> Result<Document> {
        let mut state = self.state.lock().await;

        let result = self
            .synthesis
            .generate(state.sources.list(), project_title)
            .await;

        match result {
            Ok(document) => {
                let audit = document.citation_audit(&state.sources);
                self.events.publish(DomainEvent::DocumentGenerated {
                    session_id: self.id.clone(),
                    source_count: state.sources.len(),
                    section_count: document.sections.len(),
                    stale_citations: audit.stale.len(),
                    timestamp: Utc::now(),
                });
                state.document = Some(document.clone());
                Ok(document)
            }
            Err(e) => {
                self.events.publish(DomainEvent::GenerationFailed {
                    session_id: self.id.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Apply one free-text instruction. Never fails; the outcome says what happened.
    pub async fn instruct(&self, instruction: &str) -> RevisionOutcome {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let outcome = self
            .revision
            .instruct(
                &mut state.document,
                state.sources.list(),
                &mut state.log,
                instruction,
            )
            .await;

        info!(session = %self.id, ?outcome, "Instruction handled");
        self.events.publish(self.event_for(&outcome));
        outcome
    }

    fn event_for(&self, outcome: &RevisionOutcome) -> DomainEvent {
        let session_id = self.id.clone();
        let timestamp = Utc::now();
        match outcome {
            RevisionOutcome::Declined => DomainEvent::InstructionDeclined {
                session_id,
                timestamp,
            },
            RevisionOutcome::Revised {
                from_version,
                to_version,
            } => DomainEvent::DocumentRevised {
                session_id,
                from_version: *from_version,
                to_version: *to_version,
                timestamp,
            },
            RevisionOutcome::RevisionFailed { version, reason } => DomainEvent::RevisionFailed {
                session_id,
                version: *version,
                error_message: reason.clone(),
                timestamp,
            },
            RevisionOutcome::Answered { version } => DomainEvent::QueryAnswered {
                session_id,
                version: *version,
                success: true,
                timestamp,
            },
            RevisionOutcome::QueryFailed { version, .. } => DomainEvent::QueryAnswered {
                session_id,
                version: *version,
                success: false,
                timestamp,
            },
        }
    }

    /// A clone of the live document, if one exists.
    pub async fn document(&self) -> Option<Document> {
        self.state.lock().await.document.clone()
    }

    /// Snapshot of the conversation log.
    pub async fn conversation(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.log.all().to_vec()
    }

    /// The export shape of the live document.
    pub async fn export(&self) -> Result<DocumentExport> {
        self.with_document(|doc, _| doc.export()).await
    }

    /// The live document rendered as markdown.
    pub async fn to_markdown(&self) -> Result<String> {
        self.with_document(|doc, _| doc.to_markdown()).await
    }

    /// Check the live document's citations against the registry.
    pub async fn citation_audit(&self) -> Result<CitationAudit> {
        self.with_document(|doc, sources| doc.citation_audit(sources))
            .await
    }

    async fn with_document<T>(&self, f: impl FnOnce(&Document, &SourceRegistry) -> T) -> Result<T> {
        let state = self.state.lock().await;
        let doc = state
            .document
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no document has been generated".into()))?;
        Ok(f(doc, &state.sources))
    }
}
