//! The Schema Contract shared by synthesis and revision calls.
//!
//! ```text
//! DocumentDraft {
//!     title:     string,
//!     sections:  [{ id: string, title: string, content: string }],
//!     conflicts: [string],
//! }
//! ```
//!
//! All fields are required and unknown fields are rejected. Provider output is
//! untrusted: it becomes a `Document` only after [`parse_draft`] accepts it.
//! Order of `sections` and `conflicts` is preserved as returned.

use serde::{Deserialize, Serialize};

use crate::citation;
use crate::error::{Error, Result};
use crate::provider::ResponseSchema;

/// Contract name sent alongside the schema.
pub const CONTRACT_NAME: &str = "requirements_document";

/// A section as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionDraft {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A provider response that satisfies the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentDraft {
    pub title: String,
    pub sections: Vec<SectionDraft>,
    pub conflicts: Vec<String>,
}

impl DocumentDraft {
    /// JSON Schema for the contract, passed with every structured request.
    pub fn response_schema() -> ResponseSchema {
        ResponseSchema {
            name: CONTRACT_NAME.into(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "sections": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "title": { "type": "string" },
                                "content": {
                                    "type": "string",
                                    "description": "Markdown content of the section, including citations."
                                }
                            },
                            "required": ["id", "title", "content"],
                            "additionalProperties": false
                        }
                    },
                    "conflicts": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of conflicting requirements found, if any."
                    }
                },
                "required": ["title", "sections", "conflicts"],
                "additionalProperties": false
            }),
        }
    }

    /// Semantic checks on top of the shape.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("document title is blank".into());
        }
        if self.sections.is_empty() {
            return Err("document has no sections".into());
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.sections.len());
        for (i, section) in self.sections.iter().enumerate() {
            if section.id.trim().is_empty() {
                return Err(format!("section #{i} has a blank id"));
            }
            if section.title.trim().is_empty() {
                return Err(format!("section '{}' has a blank title", section.id));
            }
            if seen.contains(&section.id.as_str()) {
                return Err(format!("duplicate section id '{}'", section.id));
            }
            seen.push(&section.id);

            let malformed = citation::malformed_markers(&section.content);
            if !malformed.is_empty() {
                return Err(format!(
                    "section '{}' has {} malformed citation marker(s)",
                    section.id,
                    malformed.len()
                ));
            }
        }
        Ok(())
    }
}

/// Strip one surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.trim_end().strip_suffix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// Parse and validate raw provider output against the contract.
pub fn parse_draft(raw: &str) -> Result<DocumentDraft> {
    let text = strip_code_fence(raw.trim());

    let draft: DocumentDraft = serde_json::from_str(text).map_err(|e| {
        tracing::debug!(error = %e, raw = %raw, "Provider output failed contract parsing");
        Error::schema_violation(e.to_string(), raw)
    })?;

    draft.validate().map_err(|reason| {
        tracing::debug!(reason = %reason, raw = %raw, "Provider output failed contract validation");
        Error::schema_violation(reason, raw)
    })?;

    Ok(draft)
}
