//! Inline citation markers.
//!
//! Section content references sources with markers of the form
//! `[Source ID: <id>]`. A marker may list several ids separated by commas
//! (`[Source ID: a1, b2]`). The textual form is stable so presentation layers
//! can split content on it, and so markers survive a round-trip through the
//! provider.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::source::SourceId;

/// Every marker starts with this literal.
pub const MARKER_PREFIX: &str = "[Source ID:";

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Source ID:[ \t]*([^\[\]\n]+?)[ \t]*\]").expect("citation marker pattern")
});

/// One source reference found in content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub source_id: SourceId,
    /// Byte range of the enclosing marker.
    pub span: std::ops::Range<usize>,
}

/// A piece of content, either plain text or a citation marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment<'a> {
    Text(&'a str),
    Citation {
        marker: &'a str,
        source_ids: Vec<SourceId>,
    },
}

/// Render the marker for a single source id.
pub fn format_marker(id: &SourceId) -> String {
    format!("{MARKER_PREFIX} {id}]")
}

/// Split a marker body (`a1, b2`) into ids. `None` if any id is malformed.
fn parse_ids(inner: &str) -> Option<Vec<SourceId>> {
    inner
        .split(',')
        .map(str::trim)
        .map(|id| {
            if id.is_empty() || id.chars().any(char::is_whitespace) {
                None
            } else {
                Some(SourceId::from(id))
            }
        })
        .collect()
}

/// Extract every well-formed citation, in order of appearance.
pub fn extract_citations(content: &str) -> Vec<Citation> {
    let mut out = Vec::new();
    for caps in MARKER.captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(ids) = parse_ids(inner.as_str()) {
            out.extend(ids.into_iter().map(|source_id| Citation {
                source_id,
                span: whole.range(),
            }));
        }
    }
    out
}

/// Split content into text and citation segments for rendering.
///
/// Concatenating the segments (text and marker strings) reproduces the input.
pub fn split_citations(content: &str) -> Vec<ContentSegment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in MARKER.captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(source_ids) = parse_ids(inner.as_str()) else {
            continue;
        };
        if whole.start() > cursor {
            segments.push(ContentSegment::Text(&content[cursor..whole.start()]));
        }
        segments.push(ContentSegment::Citation {
            marker: whole.as_str(),
            source_ids,
        });
        cursor = whole.end();
    }

    if cursor < content.len() {
        segments.push(ContentSegment::Text(&content[cursor..]));
    }
    segments
}

/// Byte offsets of marker openers that do not begin a well-formed marker.
pub fn malformed_markers(content: &str) -> Vec<usize> {
    let well_formed: Vec<usize> = MARKER
        .captures_iter(content)
        .filter(|caps| caps.get(1).is_some_and(|inner| parse_ids(inner.as_str()).is_some()))
        .filter_map(|caps| caps.get(0).map(|m| m.start()))
        .collect();

    content
        .match_indices(MARKER_PREFIX)
        .map(|(idx, _)| idx)
        .filter(|idx| !well_formed.contains(idx))
        .collect()
}

/// Cut `text` to at most `max_chars` characters without splitting a code point
/// or a citation marker. Returns the excerpt and whether anything was dropped.
///
/// When the cut lands inside a marker (or inside a partial `[Source ID:` opener)
/// the excerpt ends just before the marker's `[`.
pub fn truncate_preserving_markers(text: &str, max_chars: usize) -> (&str, bool) {
    let Some((mut cut, _)) = text.char_indices().nth(max_chars) else {
        return (text, false);
    };

    if let Some(open) = text[..cut].rfind('[') {
        let unclosed = !text[open..cut].contains(']');
        let tail = &text[open..];
        let head = &text[open..cut];
        if unclosed && (tail.starts_with(MARKER_PREFIX) || MARKER_PREFIX.starts_with(head)) {
            cut = open;
        }
    }

    (&text[..cut], true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_and_multi_id_markers() {
        let content = "SSO is required [Source ID: a1b2]. Budget capped [Source ID: c3, d4].";
        let ids: Vec<_> = extract_citations(content)
            .into_iter()
            .map(|c| c.source_id.0)
            .collect();
        assert_eq!(ids, vec!["a1b2", "c3", "d4"]);
    }

    #[test]
    fn split_roundtrips_content() {
        let content = "Intro [Source ID: x1] middle [Source ID: y2] end";
        let segments = split_citations(content);
        assert_eq!(segments.len(), 5);

        let rebuilt: String = segments
            .iter()
            .map(|s| match s {
                ContentSegment::Text(t) => *t,
                ContentSegment::Citation { marker, .. } => *marker,
            })
            .collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn split_without_markers_is_single_text() {
        assert_eq!(
            split_citations("plain text"),
            vec![ContentSegment::Text("plain text")]
        );
    }

    #[test]
    fn malformed_markers_detected() {
        assert!(malformed_markers("ok [Source ID: a1]").is_empty());
        assert_eq!(malformed_markers("bad [Source ID: ]").len(), 1);
        assert_eq!(malformed_markers("bad [Source ID: two words]").len(), 1);
        assert_eq!(malformed_markers("unterminated [Source ID: a1").len(), 1);
    }

    #[test]
    fn format_marker_is_extractable() {
        let id = SourceId::from("f00d");
        let marker = format_marker(&id);
        assert_eq!(marker, "[Source ID: f00d]");
        assert_eq!(extract_citations(&marker)[0].source_id, id);
    }

    #[test]
    fn truncate_short_text_untouched() {
        assert_eq!(truncate_preserving_markers("hello", 10), ("hello", false));
        assert_eq!(truncate_preserving_markers("hello", 5), ("hello", false));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let (excerpt, truncated) = truncate_preserving_markers("héllo wörld", 4);
        assert_eq!(excerpt, "héll");
        assert!(truncated);
    }

    #[test]
    fn truncate_backs_off_before_split_marker() {
        let text = "abc [Source ID: 1234] tail";
        // Cut would land inside the marker.
        let (excerpt, truncated) = truncate_preserving_markers(text, 10);
        assert_eq!(excerpt, "abc ");
        assert!(truncated);
    }

    #[test]
    fn truncate_backs_off_before_partial_opener() {
        let text = "abc [Sour and more text";
        let (excerpt, _) = truncate_preserving_markers(text, 8);
        assert_eq!(excerpt, "abc ");
    }

    #[test]
    fn truncate_keeps_complete_marker_and_plain_brackets() {
        let text = "abc [Source ID: 12] def [note] more";
        let (excerpt, _) = truncate_preserving_markers(text, 22);
        assert_eq!(excerpt, "abc [Source ID: 12] de");

        let (excerpt, _) = truncate_preserving_markers("see [note here] after", 8);
        assert_eq!(excerpt, "see [not");
    }
}
