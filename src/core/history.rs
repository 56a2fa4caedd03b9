//! Bounded memory of completed question/answer turns.
//!
//! Only answers that ran to completion while still current are ever appended;
//! discarded and errored turns never appear here. The history is read by
//! prompt assembly as a deterministic `Q1:`/`A1:` rendering.

use std::collections::VecDeque;
use std::fmt::Write as _;

/// One committed question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    pub question: String,
    pub answer: String,
}

/// Ordered, bounded log of committed turns.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<CompletedTurn>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Appends a committed turn, dropping the oldest beyond the bound.
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(CompletedTurn {
            question: question.into(),
            answer: answer.into(),
        });
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns a length-bounded copy for reads outside the lock.
    pub fn snapshot(&self) -> Vec<CompletedTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Renders the history for prompt enrichment, oldest first.
    ///
    /// Deterministic and read-only: `Q1:`/`A1:` pairs separated by blank
    /// lines, empty string when there is no history.
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();
        for (i, turn) in self.turns.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "Q{}: {}", i + 1, turn.question);
            let _ = write!(out, "A{}: {}", i + 1, turn.answer);
            out.push('\n');
        }
        out
    }
}
