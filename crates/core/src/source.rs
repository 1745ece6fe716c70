//! Source records and the session's Source Registry.
//!
//! A source is one piece of raw communication (an email, a meeting transcript,
//! a chat thread...). Sources are immutable once registered and are referenced
//! from document content only through citation markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a source, stable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    /// Generate a short random id.
    ///
    /// Citation markers embed the id verbatim, so it is kept compact:
    /// the first 12 hex digits of a v4 UUID (48 random bits).
    pub fn new() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..12].to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of communication a source was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Email,
    MeetingTranscript,
    ChatThread,
    Document,
    Note,
}

impl SourceKind {
    /// The wire label used in prompts (`MEETING_TRANSCRIPT`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::MeetingTranscript => "MEETING_TRANSCRIPT",
            Self::ChatThread => "CHAT_THREAD",
            Self::Document => "DOCUMENT",
            Self::Note => "NOTE",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "email" => Ok(Self::Email),
            "meeting_transcript" | "meeting" | "transcript" => Ok(Self::MeetingTranscript),
            "chat_thread" | "chat" | "slack" | "slack_thread" => Ok(Self::ChatThread),
            "document" | "doc" => Ok(Self::Document),
            "note" | "text_note" => Ok(Self::Note),
            other => Err(Error::InvalidSource(format!("unknown source kind '{other}'"))),
        }
    }
}

/// A single ingested source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub kind: SourceKind,
    pub title: String,
    /// Already-decoded text body.
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Source {
    /// Create a new source with a fresh id and the current timestamp.
    pub fn new(kind: SourceKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(),
            kind,
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
            author: None,
        }
    }

    /// Attach an author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Holds the session's sources in insertion order.
///
/// Insertion order matters: it is the prompt order and the citation display order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built source. Rejects blank titles/bodies and duplicate ids.
    pub fn add(&mut self, source: Source) -> Result<SourceId> {
        if source.title.trim().is_empty() {
            return Err(Error::InvalidSource("title must not be blank".into()));
        }
        if source.body.trim().is_empty() {
            return Err(Error::InvalidSource(format!(
                "source '{}' has an empty body",
                source.title
            )));
        }
        if self.contains(&source.id) {
            return Err(Error::InvalidSource(format!(
                "duplicate source id '{}'",
                source.id
            )));
        }

        let id = source.id.clone();
        tracing::debug!(source_id = %id, kind = %source.kind, "Source registered");
        self.sources.push(source);
        Ok(id)
    }

    /// Ingestion entry point: build and register a source from decoded text.
    pub fn add_source(
        &mut self,
        kind: SourceKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<SourceId> {
        self.add(Source::new(kind, title, body))
    }

    pub fn get(&self, id: &SourceId) -> Result<&Source> {
        self.sources
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.sources.iter().any(|s| &s.id == id)
    }

    /// All sources in insertion order.
    pub fn list(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_preserves_insertion_order() {
        let mut registry = SourceRegistry::new();
        let a = registry
            .add_source(SourceKind::MeetingTranscript, "Kickoff notes", "We need SSO.")
            .unwrap();
        let b = registry
            .add_source(SourceKind::Email, "Email thread", "Budget is 50k.")
            .unwrap();

        let ids: Vec<_> = registry.list().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let registry = SourceRegistry::new();
        let err = registry.get(&SourceId::from("missing")).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(id) if id == "missing"));
    }

    #[test]
    fn blank_title_or_body_rejected() {
        let mut registry = SourceRegistry::new();
        assert!(registry.add_source(SourceKind::Note, "  ", "body").is_err());
        assert!(registry.add_source(SourceKind::Note, "title", "\n\t").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut registry = SourceRegistry::new();
        let mut source = Source::new(SourceKind::Note, "One", "first");
        source.id = SourceId::from("abc");
        registry.add(source.clone()).unwrap();

        source.title = "Two".into();
        assert!(matches!(registry.add(source), Err(Error::InvalidSource(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: std::collections::HashSet<_> = (0..500).map(|_| SourceId::new()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.as_str().len() == 12));
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("slack".parse::<SourceKind>().unwrap(), SourceKind::ChatThread);
        assert_eq!(
            "meeting-transcript".parse::<SourceKind>().unwrap(),
            SourceKind::MeetingTranscript
        );
        assert!("fax".parse::<SourceKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&SourceKind::MeetingTranscript).unwrap();
        assert_eq!(json, "\"MEETING_TRANSCRIPT\"");
    }
}
