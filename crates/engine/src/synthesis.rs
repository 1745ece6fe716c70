//! First-pass synthesis: sources in, version-1 document out.
//!
//! Exactly one structured provider call per `generate`. Any failure aborts
//! the whole operation; no partial document is ever returned.

use crate::call::with_timeout;
use crate::context::ContextAssembler;
use crate::settings::GenerationSettings;
use reqsynth_core::document::Document;
use reqsynth_core::error::{Error, Result};
use reqsynth_core::provider::Provider;
use reqsynth_core::schema::{DocumentDraft, parse_draft};
use reqsynth_core::source::Source;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a fresh document from a set of sources.
pub struct SynthesisEngine {
    provider: Arc<dyn Provider>,
    assembler: ContextAssembler,
    settings: GenerationSettings,
}

impl SynthesisEngine {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self {
            provider,
            assembler: ContextAssembler::new(
                settings.source_excerpt_chars,
                settings.query_history_turns,
            ),
            settings,
        }
    }

    /// Synthesize a document from `sources` for a project called `project_title`.
    ///
    /// Fails with `EmptyInput` before any provider call when `sources` is empty.
    pub async fn generate(&self, sources: &[Source], project_title: &str) -> Result<Document> {
        if sources.is_empty() {
            return Err(Error::EmptyInput);
        }

        let assembled = self.assembler.full_synthesis(sources, project_title);
        info!(
            provider = self.provider.name(),
            model = %self.settings.model,
            sources = assembled.metadata.sources_included,
            estimated_tokens = assembled.metadata.estimated_tokens,
            "Synthesizing document"
        );

        let request = self
            .settings
            .request(assembled.prompt)
            .with_thinking_budget(self.settings.synthesis_thinking_budget);

        let response = with_timeout(
            self.provider.time_budget(self.settings.request_timeout),
            self.provider
                .structured_generate(request, DocumentDraft::response_schema()),
        )
        .await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Synthesis usage"
            );
        }

        let raw = response.into_content()?;
        let document = Document::from_draft(parse_draft(&raw)?);

        let stale = stale_citations(&document, sources);
        if !stale.is_empty() {
            warn!(
                stale = ?stale,
                "Synthesized document cites unknown sources"
            );
        }

        info!(
            title = %document.title,
            sections = document.sections.len(),
            conflicts = document.conflicts.len(),
            "Document synthesized"
        );
        Ok(document)
    }
}

/// Cited ids that match none of `sources`, deduplicated in first-seen order.
fn stale_citations(document: &Document, sources: &[Source]) -> Vec<String> {
    let mut stale: Vec<String> = Vec::new();
    for section in &document.sections {
        for id in section.cited_sources() {
            let known = sources.iter().any(|s| s.id == id);
            if !known && !stale.iter().any(|s| s == id.as_str()) {
                stale.push(id.as_str().to_string());
            }
        }
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use reqsynth_core::error::ProviderError;
    use reqsynth_core::source::{SourceId, SourceKind};
    use std::time::Duration;

    fn source(id: &str) -> Source {
        let mut s = Source::new(SourceKind::Email, "Kickoff", "We need a portal.");
        s.id = SourceId::from(id);
        s
    }

    fn engine(provider: Arc<dyn Provider>) -> SynthesisEngine {
        SynthesisEngine::new(provider, GenerationSettings::default())
    }

    #[tokio::test]
    async fn empty_sources_fail_without_provider_call() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let err = engine(provider.clone())
            .generate(&[], "Portal")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_response_builds_version_one() {
        let json = document_json("Customer Portal", "a1");
        let provider = Arc::new(SequentialMockProvider::texts(&[json.as_str()]));
        let doc = engine(provider.clone())
            .generate(&[source("a1")], "Customer Portal")
            .await
            .unwrap();

        assert_eq!(doc.version, 1);
        assert_eq!(doc.title, "Customer Portal");
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn request_is_structured_with_synthesis_budget() {
        let json = document_json("P", "a1");
        let provider = Arc::new(SequentialMockProvider::texts(&[json.as_str()]));
        engine(provider.clone())
            .generate(&[source("a1")], "P")
            .await
            .unwrap();

        let req = &provider.requests()[0];
        assert_eq!(req.response_schema, Some(DocumentDraft::response_schema()));
        assert_eq!(req.thinking_budget, Some(4096));
        assert!(req.prompt.contains("[Source ID: a1] (EMAIL - Kickoff)"));
    }

    #[tokio::test]
    async fn malformed_json_is_schema_violation() {
        let provider = Arc::new(SequentialMockProvider::texts(&["{\"title\": \"x\""]));
        let err = engine(provider)
            .generate(&[source("a1")], "P")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert_eq!(err.raw_response(), Some("{\"title\": \"x\""));
    }

    #[tokio::test]
    async fn empty_content_is_provider_error() {
        let provider = Arc::new(SequentialMockProvider::texts(&["   "]));
        let err = engine(provider)
            .generate(&[source("a1")], "P")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::EmptyResponse)));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::RateLimited {
                retry_after_secs: 5,
            },
        )]));
        let err = engine(provider)
            .generate(&[source("a1")], "P")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::RateLimited { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let mut settings = GenerationSettings::default();
        settings.request_timeout = Duration::from_secs(2);
        let engine = SynthesisEngine::new(Arc::new(HangingProvider), settings);

        let err = engine.generate(&[source("a1")], "P").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn stale_citations_are_kept_not_rewritten() {
        let json = document_json("P", "ghost");
        let provider = Arc::new(SequentialMockProvider::texts(&[json.as_str()]));
        let doc = engine(provider)
            .generate(&[source("a1")], "P")
            .await
            .unwrap();

        assert!(doc.sections[0].content.contains("[Source ID: ghost]"));
        assert_eq!(stale_citations(&doc, &[source("a1")]), vec!["ghost"]);
    }
}
