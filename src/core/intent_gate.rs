//! Lexical short-circuit classifier.
//!
//! Runs before any agent is invoked so trivial turns ("yes", "ok", "?")
//! don't pay for a full fan-out. Purely lexical — no model call, no I/O —
//! a plain word-set/keyword check rather than an embedding call. Takes the
//! conversation history alongside the raw message so a short reply can be
//! read against the turn it's replying to (see [`classify`]'s prior-question
//! lookback).

use crate::core::types::{AgentMessage, MessageRole};

/// Coarse classification of a user turn before any agent sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Blank or whitespace-only input.
    Empty,
    /// Ends with `?` or opens with an interrogative word.
    Question,
    /// Short request for more detail ("tell me more", "explain").
    InfoRequest,
    /// Short negative acknowledgement ("no", "nope", "cancel").
    Negative,
    /// Short positive acknowledgement ("yes", "ok", "sounds good").
    Positive,
    /// Anything else — routed through the full coordinator pipeline.
    Neutral,
}

const INTERROGATIVES: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "can", "could", "would", "should", "is",
    "are", "do", "does",
];

const INFO_REQUEST_PHRASES: &[&str] = &[
    "tell me more",
    "explain",
    "elaborate",
    "go on",
    "more detail",
    "more details",
    "expand on that",
    "continue",
];

const NEGATIVE_WORDS: &[&str] = &["no", "nope", "nah", "cancel", "stop", "never mind", "nevermind"];

const POSITIVE_WORDS: &[&str] = &[
    "yes", "yep", "yeah", "ok", "okay", "sure", "sounds good", "great", "perfect", "agreed",
];

/// Classify a raw user message against the conversation history that led up
/// to it. Matching is case-insensitive and trims surrounding
/// whitespace/punctuation before comparison.
///
/// `history` feeds exactly one rule: a short reply that doesn't match the
/// fixed negative word list outright ("not now", "not really") is still
/// classified [`Intent::Negative`] when the most recent assistant turn was
/// itself a question — otherwise a terse decline of a direct question would
/// fall through to [`Intent::Neutral`] and pay for a full fan-out it doesn't
/// need.
pub fn classify(message: &str, history: &[AgentMessage]) -> Intent {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Intent::Empty;
    }

    let lower = trimmed.to_lowercase();
    let normalized = lower.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());

    if trimmed.ends_with('?') {
        return Intent::Question;
    }
    if let Some(first_word) = normalized.split_whitespace().next() {
        if INTERROGATIVES.contains(&first_word) {
            return Intent::Question;
        }
    }

    if INFO_REQUEST_PHRASES.iter().any(|phrase| normalized.contains(phrase)) {
        return Intent::InfoRequest;
    }

    let word_count = normalized.split_whitespace().count();
    if word_count <= 3 {
        if NEGATIVE_WORDS.contains(&normalized) {
            return Intent::Negative;
        }
        if POSITIVE_WORDS.contains(&normalized) {
            return Intent::Positive;
        }
        if normalized.starts_with("no") && prior_turn_was_question(history) {
            return Intent::Negative;
        }
    }

    Intent::Neutral
}

/// Whether the most recent assistant turn in `history` was itself a question.
fn prior_turn_was_question(history: &[AgentMessage]) -> bool {
    history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content.trim_end().ends_with('?'))
        .unwrap_or(false)
}
