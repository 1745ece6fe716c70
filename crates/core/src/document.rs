//! The versioned requirements document.
//!
//! A `Document` is only ever created from a validated [`DocumentDraft`]. It is
//! replaced, never mutated, on each successful revision: [`Document::revise`]
//! returns a new value at `version + 1` and leaves `self` untouched.

use serde::{Deserialize, Serialize};

use crate::citation::{self, ContentSegment};
use crate::schema::{DocumentDraft, SectionDraft};
use crate::source::{SourceId, SourceRegistry};

/// One titled section of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Markdown-like text with inline citation markers.
    pub content: String,
}

impl Section {
    /// Source ids cited in this section, in order of appearance (may repeat).
    pub fn cited_sources(&self) -> Vec<SourceId> {
        citation::extract_citations(&self.content)
            .into_iter()
            .map(|c| c.source_id)
            .collect()
    }

    /// Content split into text and citation segments.
    pub fn segments(&self) -> Vec<ContentSegment<'_>> {
        citation::split_citations(&self.content)
    }
}

impl From<SectionDraft> for Section {
    fn from(draft: SectionDraft) -> Self {
        Self {
            id: draft.id,
            title: draft.title,
            content: draft.content,
        }
    }
}

/// The structured, versioned artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub sections: Vec<Section>,
    pub conflicts: Vec<String>,
    pub version: u64,
}

/// The plain export shape consumed by presentation: no version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExport {
    pub title: String,
    pub sections: Vec<Section>,
    pub conflicts: Vec<String>,
}

/// Result of checking citations against the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationAudit {
    /// Distinct cited ids known to the registry, first-seen order.
    pub resolved: Vec<SourceId>,
    /// Distinct cited ids the registry does not know (stale or invented).
    pub stale: Vec<SourceId>,
}

impl CitationAudit {
    pub fn is_clean(&self) -> bool {
        self.stale.is_empty()
    }
}

impl Document {
    /// First version of a document, built from a validated draft.
    pub fn from_draft(draft: DocumentDraft) -> Self {
        Self::at_version(draft, 1)
    }

    fn at_version(draft: DocumentDraft, version: u64) -> Self {
        Self {
            title: draft.title,
            sections: draft.sections.into_iter().map(Section::from).collect(),
            conflicts: draft.conflicts,
            version,
        }
    }

    /// Build the successor of this document from a validated revision draft.
    pub fn revise(&self, draft: DocumentDraft) -> Self {
        Self::at_version(draft, self.version + 1)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The export shape `{title, sections, conflicts}`.
    pub fn export(&self) -> DocumentExport {
        DocumentExport {
            title: self.title.clone(),
            sections: self.sections.clone(),
            conflicts: self.conflicts.clone(),
        }
    }

    /// Pretty JSON of the export shape, as sent to the provider for revisions and queries.
    pub fn to_context_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export())
    }

    /// Check every citation against the registry.
    pub fn citation_audit(&self, registry: &SourceRegistry) -> CitationAudit {
        let mut audit = CitationAudit::default();
        for id in self.sections.iter().flat_map(Section::cited_sources) {
            if audit.resolved.contains(&id) || audit.stale.contains(&id) {
                continue;
            }
            if registry.contains(&id) {
                audit.resolved.push(id);
            } else {
                audit.stale.push(id);
            }
        }
        audit
    }

    /// Render as markdown: title, conflicts block, then sections in order.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);

        if !self.conflicts.is_empty() {
            out.push_str("> **Potential Conflicts Detected**\n");
            for conflict in &self.conflicts {
                out.push_str(&format!("> - {conflict}\n"));
            }
            out.push('\n');
        }

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content.trim_end()));
        }

        out.truncate(out.trim_end().len());
        out.push('\n');
        out
    }
}
