//! Events flowing from answer workers to the display consumer.
//!
//! Every event carries the generation that produced it so the consumer can
//! drop stale output at apply time. Events are serializable for debug dumps
//! and a future JSON output mode.

use serde::{Deserialize, Serialize};

use crate::core::generation::Generation;

/// A generation-tagged display mutation.
///
/// Ordering within one generation follows enqueue order; ordering across
/// generations is irrelevant because only one generation is ever live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
    /// A new turn began; the question becomes the turn header.
    NewTurn {
        generation: Generation,
        question: String,
    },

    /// Incremental answer text from the completion stream.
    Token {
        generation: Generation,
        text: String,
    },

    /// The completion stream failed mid-answer.
    Error {
        generation: Generation,
        message: String,
    },

    /// Roll the display back to the start of the most recent turn.
    RemoveLastTurn { generation: Generation },

    /// Wipe the entire display.
    ClearAll { generation: Generation },
}

impl AnswerEvent {
    /// Returns the generation that produced this event.
    pub fn generation(&self) -> Generation {
        match self {
            AnswerEvent::NewTurn { generation, .. }
            | AnswerEvent::Token { generation, .. }
            | AnswerEvent::Error { generation, .. }
            | AnswerEvent::RemoveLastTurn { generation }
            | AnswerEvent::ClearAll { generation } => *generation,
        }
    }
}
