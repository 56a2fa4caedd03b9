//! The display log: the pipeline's observable output.
//!
//! An append-mostly buffer of styled spans with a turn-start checkpoint for
//! rollback, a maximum line bound trimmed from the oldest end, and the scroll
//! state the renderer pins against. Exactly one actor (the display consumer)
//! mutates it; everyone else reads.

use crate::ui::scroll::ScrollState;

/// Style tag for a display span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    /// Prose answer text.
    Text,
    /// Question header for a turn.
    Question,
    /// System note (errors, status).
    Notice,
    /// Fenced code content.
    Code,
}

/// One styled run of text. May span multiple lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// Bounded, ordered, styled text buffer.
pub struct DisplayLog {
    spans: Vec<Span>,
    /// Span index where the most recent turn's content begins.
    turn_start: Option<usize>,
    max_lines: usize,
    /// Bumped on every mutation; cheap dirty tracking for the renderer.
    revision: u64,
    pub scroll: ScrollState,
}

impl DisplayLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            spans: Vec::new(),
            turn_start: None,
            max_lines: max_lines.max(1),
            revision: 0,
            scroll: ScrollState::new(),
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Full text of the log, styles stripped.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Number of display lines: newline-terminated lines plus a trailing
    /// partial line.
    pub fn line_count(&self) -> usize {
        let newlines: usize = self
            .spans
            .iter()
            .map(|s| s.text.matches('\n').count())
            .sum();
        let trailing = match self.spans.last() {
            Some(last) if !last.text.ends_with('\n') => 1,
            _ => 0,
        };
        newlines + trailing
    }

    /// Starts a new turn: records the checkpoint at the current end, then
    /// appends the question header.
    pub fn begin_turn(&mut self, question: &str) {
        self.revision += 1;
        self.turn_start = Some(self.spans.len());

        let mut header = String::new();
        if !self.spans.is_empty() {
            header.push('\n');
        }
        header.push_str(question);
        header.push('\n');
        self.spans.push(Span {
            text: header,
            style: SpanStyle::Question,
        });
    }

    /// Appends styled text, merging into the trailing span when styles match.
    /// Never merges across the turn checkpoint.
    pub fn append(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        self.revision += 1;

        let at_checkpoint = self.turn_start == Some(self.spans.len());
        if !at_checkpoint
            && let Some(last) = self.spans.last_mut()
            && last.style == style
        {
            last.text.push_str(text);
            return;
        }
        self.spans.push(Span {
            text: text.to_string(),
            style,
        });
    }

    /// Rolls the log back to the recorded checkpoint and clears it.
    /// No-op when no checkpoint is recorded.
    pub fn truncate_last_turn(&mut self) {
        if let Some(start) = self.turn_start.take() {
            self.spans.truncate(start);
            self.revision += 1;
        }
    }

    /// Wipes the entire log.
    pub fn clear(&mut self) {
        if !self.spans.is_empty() || self.turn_start.is_some() {
            self.revision += 1;
        }
        self.spans.clear();
        self.turn_start = None;
        self.scroll.reset();
    }

    /// Trims whole lines from the oldest end until the bound holds.
    /// Returns the number of lines removed; anchored scroll offsets shift up
    /// to match.
    pub fn enforce_line_bound(&mut self) -> usize {
        let mut count = self.line_count();
        let mut trimmed = 0;
        while count > self.max_lines {
            self.trim_oldest_line();
            count -= 1;
            trimmed += 1;
        }
        if trimmed > 0 {
            self.revision += 1;
            self.scroll.adjust_for_trim(trimmed);
        }
        trimmed
    }

    /// Removes content up to and including the first newline.
    fn trim_oldest_line(&mut self) {
        while !self.spans.is_empty() {
            let first = &mut self.spans[0];
            if let Some(pos) = first.text.find('\n') {
                first.text.drain(..=pos);
                if self.spans[0].text.is_empty() {
                    self.spans.remove(0);
                    self.note_front_span_removed();
                }
                return;
            }
            self.spans.remove(0);
            self.note_front_span_removed();
        }
    }

    fn note_front_span_removed(&mut self) {
        if let Some(start) = self.turn_start.as_mut() {
            *start = start.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_turn_records_checkpoint_before_header() {
        let mut log = DisplayLog::new(100);
        log.begin_turn("What is BGP?");
        log.append("A routing protocol.", SpanStyle::Text);
        assert_eq!(log.text(), "What is BGP?\nA routing protocol.");

        log.truncate_last_turn();
        assert_eq!(log.text(), "");
    }

    #[test]
    fn test_rollback_is_byte_identical() {
        let mut log = DisplayLog::new(100);
        log.begin_turn("First?");
        log.append("Answer one.\n", SpanStyle::Text);
        let before = log.text();

        log.begin_turn("Second?");
        log.append("Par", SpanStyle::Text);
        log.append("tial", SpanStyle::Text);
        log.truncate_last_turn();

        assert_eq!(log.text(), before);
    }

    #[test]
    fn test_truncate_without_checkpoint_is_noop() {
        let mut log = DisplayLog::new(100);
        log.append("standing content\n", SpanStyle::Notice);
        log.truncate_last_turn();
        assert_eq!(log.text(), "standing content\n");

        // A second truncate after the checkpoint was consumed is also a no-op.
        log.begin_turn("q?");
        log.truncate_last_turn();
        log.truncate_last_turn();
        assert_eq!(log.text(), "standing content\n");
    }

    #[test]
    fn test_append_merges_same_style_spans() {
        let mut log = DisplayLog::new(100);
        log.begin_turn("q?");
        log.append("one ", SpanStyle::Text);
        log.append("two", SpanStyle::Text);
        log.append("code", SpanStyle::Code);
        // Header + merged prose + code.
        assert_eq!(log.spans().len(), 3);
    }

    #[test]
    fn test_append_never_merges_across_checkpoint() {
        let mut log = DisplayLog::new(100);
        log.append("old notice", SpanStyle::Notice);
        log.begin_turn("q?");
        log.truncate_last_turn();

        // Checkpoint sat at the end of the log; appending after rollback must
        // not have fused new content into the old span.
        log.append(" extra", SpanStyle::Notice);
        assert_eq!(log.text(), "old notice extra");
    }

    #[test]
    fn test_line_bound_trims_oldest() {
        let mut log = DisplayLog::new(3);
        log.append("l1\nl2\nl3\nl4\nl5\n", SpanStyle::Text);
        let trimmed = log.enforce_line_bound();
        assert_eq!(trimmed, 2);
        assert_eq!(log.text(), "l3\nl4\nl5\n");
        assert_eq!(log.line_count(), 3);
    }

    #[test]
    fn test_line_bound_adjusts_checkpoint() {
        let mut log = DisplayLog::new(2);
        log.append("old1\nold2\n", SpanStyle::Text);
        log.begin_turn("q?");
        log.append("answer\n", SpanStyle::Text);

        log.enforce_line_bound();
        log.truncate_last_turn();
        // The old content was trimmed away; rollback removes only the turn.
        assert!(!log.text().contains("answer"));
        assert!(!log.text().contains("q?"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut log = DisplayLog::new(100);
        log.begin_turn("q?");
        log.append("text", SpanStyle::Text);
        log.clear();
        assert_eq!(log.text(), "");
        assert_eq!(log.line_count(), 0);
        // Cleared checkpoint: rollback is a no-op.
        log.append("after", SpanStyle::Text);
        log.truncate_last_turn();
        assert_eq!(log.text(), "after");
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut log = DisplayLog::new(100);
        let r0 = log.revision();
        log.begin_turn("q?");
        assert!(log.revision() > r0);
        let r1 = log.revision();
        log.append("x", SpanStyle::Text);
        assert!(log.revision() > r1);
    }

    #[test]
    fn test_line_count_counts_trailing_partial_line() {
        let mut log = DisplayLog::new(100);
        log.append("a\nb", SpanStyle::Text);
        assert_eq!(log.line_count(), 2);
        log.append("\n", SpanStyle::Text);
        assert_eq!(log.line_count(), 2);
    }
}
