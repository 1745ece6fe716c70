//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! Good enough for logging prompt sizes; not used for hard limits.

use reqsynth_core::conversation::ConversationTurn;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single turn including per-turn overhead
/// for the role label and line framing.
pub fn estimate_turn_tokens(turn: &ConversationTurn) -> usize {
    let overhead = 4;
    overhead + estimate_tokens(&turn.content)
}

/// Estimate tokens for a slice of turns.
pub fn estimate_turns_tokens(turns: &[ConversationTurn]) -> usize {
    turns.iter().map(estimate_turn_tokens).sum()
}
