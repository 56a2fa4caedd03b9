//! Streaming code-fence tracking.
//!
//! Answer tokens arrive in arbitrary chunk sizes, so the three-backtick fence
//! delimiter (and the language tag behind it) can be split across chunks.
//! This tracker consumes chunks incrementally and emits styled segments,
//! stripping the fence lines themselves from the output.

/// A run of answer text with its code/prose classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub code: bool,
}

/// Incremental prose/code state machine for one turn's answer.
#[derive(Debug)]
pub struct FenceTracker {
    in_code: bool,
    /// Backticks seen so far of a potential fence (may split across chunks).
    tick_run: usize,
    at_line_start: bool,
    /// Consuming the remainder of a fence line (language tag or fence tail).
    skip_line: bool,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self {
            in_code: false,
            tick_run: 0,
            at_line_start: true,
            skip_line: false,
        }
    }

    /// Resets formatting state for a new turn.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Consumes one token chunk and returns the styled segments it produced.
    pub fn feed(&mut self, chunk: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = String::new();

        for c in chunk.chars() {
            if self.skip_line {
                if c == '\n' {
                    self.skip_line = false;
                    self.at_line_start = true;
                }
                continue;
            }

            // Fences only count at the start of a line.
            if c == '`' && (self.at_line_start || self.tick_run > 0) {
                self.tick_run += 1;
                if self.tick_run == 3 {
                    self.tick_run = 0;
                    flush(&mut segments, &mut current, self.in_code);
                    self.in_code = !self.in_code;
                    self.skip_line = true;
                    self.at_line_start = false;
                }
                continue;
            }

            if self.tick_run > 0 {
                // Fewer than three backticks; they were literal after all.
                current.push_str(&"`".repeat(self.tick_run));
                self.tick_run = 0;
            }
            current.push(c);
            self.at_line_start = c == '\n';
        }

        flush(&mut segments, &mut current, self.in_code);
        segments
    }
}

impl Default for FenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn flush(segments: &mut Vec<Segment>, current: &mut String, code: bool) {
    if !current.is_empty() {
        segments.push(Segment {
            text: std::mem::take(current),
            code,
        });
    }
}
