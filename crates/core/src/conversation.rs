//! Conversation turns and the append-only Conversation Log.
//!
//! Every instruction a user sends produces exactly two turns: the user's turn
//! and the reply (assistant or system). The log offers no way to edit,
//! reorder, or delete a turn once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The end user
    User,
    /// The synthesis assistant
    Assistant,
    /// Canned guidance from the engine itself
    System,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: TurnRole,

    /// The text content
    pub content: String,

    /// Wall-clock time, never earlier than the previous turn's
    pub timestamp: DateTime<Utc>,

    /// Position in the log (0-based)
    pub seq: u64,
}

/// Append-only, ordered record of the dialogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn stamped now.
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) -> &ConversationTurn {
        self.append_at(role, content, Utc::now())
    }

    /// Append a turn with an explicit timestamp, clamped so timestamps never go backwards.
    pub fn append_at(
        &mut self,
        role: TurnRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> &ConversationTurn {
        let timestamp = match self.turns.last() {
            Some(prev) if prev.timestamp > timestamp => prev.timestamp,
            _ => timestamp,
        };
        let seq = self.turns.len() as u64;
        self.turns.push(ConversationTurn {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
            seq,
        });
        &self.turns[self.turns.len() - 1]
    }

    /// All turns in chronological order.
    pub fn all(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn count_by_role(&self, role: TurnRole) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
