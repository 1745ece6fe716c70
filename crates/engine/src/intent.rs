//! Instruction intent classification.
//!
//! A keyword heuristic: the instruction is lower-cased and searched for any
//! edit keyword as a plain substring. A hit anywhere means `Edit`, so words
//! that merely contain a keyword ("address", "additional") also route to the
//! edit path.

use serde::{Deserialize, Serialize};

/// Substrings that mark an instruction as a document edit.
pub const EDIT_KEYWORDS: [&str; 5] = ["change", "update", "add", "remove", "rewrite"];

/// What an instruction asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Mutate the document and bump its version
    Edit,
    /// Answer a question; the document stays untouched
    Query,
}

/// Routes instructions to the edit or query path.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    keywords: Vec<String>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_keywords(EDIT_KEYWORDS)
    }
}

impl IntentClassifier {
    /// A classifier with a custom keyword set. Keywords are matched lower-cased.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, instruction: &str) -> Intent {
        let lower = instruction.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            Intent::Edit
        } else {
            Intent::Query
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_keywords_classify_as_edit() {
        let c = IntentClassifier::default();
        assert_eq!(c.classify("please update the budget section"), Intent::Edit);
        assert_eq!(c.classify("ADD a 2FA requirement"), Intent::Edit);
        assert_eq!(c.classify("Remove the timeline"), Intent::Edit);
        assert_eq!(c.classify("Rewrite in a formal tone"), Intent::Edit);
        assert_eq!(c.classify("change owner to Priya"), Intent::Edit);
    }

    #[test]
    fn questions_classify_as_query() {
        let c = IntentClassifier::default();
        assert_eq!(c.classify("what are the risks?"), Intent::Query);
        assert_eq!(c.classify("Who are the stakeholders?"), Intent::Query);
        assert_eq!(c.classify(""), Intent::Query);
    }

    #[test]
    fn substring_match_anywhere() {
        let c = IntentClassifier::default();
        assert_eq!(c.classify("How do we address latency?"), Intent::Edit);
        assert_eq!(c.classify("Which additional risks exist?"), Intent::Edit);
    }

    #[test]
    fn classification_is_pure() {
        let c = IntentClassifier::default();
        let first = c.classify("What changed?");
        for _ in 0..10 {
            assert_eq!(c.classify("What changed?"), first);
        }
    }

    #[test]
    fn custom_keywords() {
        let c = IntentClassifier::with_keywords(["Insert"]);
        assert_eq!(c.classify("insert a section"), Intent::Edit);
        assert_eq!(c.classify("add a section"), Intent::Query);
    }
}
