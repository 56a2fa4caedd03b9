//! The display consumer: the single mutator of the display log.
//!
//! Drains the event queue on a fixed cadence, a bounded batch per tick.
//! Every event is re-checked against the current generation at apply time —
//! the controller's preemption drain is not enough on its own, because a
//! trailing event from a just-superseded worker can land after the drain.

use std::sync::{Arc, Mutex};

use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::trace;

use crate::core::events::AnswerEvent;
use crate::core::generation::{Generation, GenerationCounter};
use crate::core::lock;
use crate::core::queue::EventQueue;
use crate::ui::display::{DisplayLog, SpanStyle};
use crate::ui::fence::FenceTracker;

/// Shared handle to the display log.
///
/// The consumer holds the only mutating reference by convention; the renderer
/// reads between ticks.
pub type SharedDisplayLog = Arc<Mutex<DisplayLog>>;

/// Applies queued answer events to the display log.
pub struct DisplayConsumer {
    queue: Arc<EventQueue>,
    generations: Arc<GenerationCounter>,
    log: SharedDisplayLog,
    fence: FenceTracker,
    batch_size: usize,
    /// Generation whose turn owns the visible checkpoint. Rollback applies
    /// only to the directly preceding turn: if that turn's header never
    /// reached the display, the checkpoint belongs to an older, finished
    /// turn that must stay.
    turn_owner: Option<Generation>,
}

impl DisplayConsumer {
    pub fn new(
        queue: Arc<EventQueue>,
        generations: Arc<GenerationCounter>,
        log: SharedDisplayLog,
        batch_size: usize,
    ) -> Self {
        Self {
            queue,
            generations,
            log,
            fence: FenceTracker::new(),
            batch_size,
            turn_owner: None,
        }
    }

    /// Runs the polling loop until the task is dropped.
    pub async fn run(mut self, poll_interval: Duration) {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// Applies one bounded batch of events. Returns how many were applied
    /// (stale drops not counted).
    pub fn tick(&mut self) -> usize {
        let batch = self.queue.drain_batch(self.batch_size);
        if batch.is_empty() {
            return 0;
        }

        let mut log = lock(&self.log);
        let mut applied = 0;
        for event in batch {
            // Mandatory second staleness check: preemption can slip in
            // between enqueue and dequeue even after the controller's drain.
            if !self.generations.is_current(event.generation()) {
                trace!(generation = %event.generation(), "dropping stale event");
                continue;
            }
            applied += 1;

            match event {
                AnswerEvent::NewTurn {
                    generation,
                    question,
                } => {
                    self.fence.reset();
                    log.begin_turn(&question);
                    self.turn_owner = Some(generation);
                }
                AnswerEvent::Token { text, .. } => {
                    for segment in self.fence.feed(&text) {
                        let style = if segment.code {
                            SpanStyle::Code
                        } else {
                            SpanStyle::Text
                        };
                        log.append(&segment.text, style);
                    }
                }
                AnswerEvent::Error { message, .. } => {
                    log.append(&format!("\n[answer error: {message}]\n"), SpanStyle::Notice);
                    // The turn terminated on screen; it is no longer a
                    // rollback candidate.
                    self.turn_owner = None;
                }
                AnswerEvent::RemoveLastTurn { generation } => {
                    if self
                        .turn_owner
                        .take_if(|owner| generation.follows(*owner))
                        .is_some()
                    {
                        log.truncate_last_turn();
                    }
                }
                AnswerEvent::ClearAll { .. } => {
                    self.fence.reset();
                    log.clear();
                    self.turn_owner = None;
                }
            }
        }

        // Bound enforcement shifts anchored scroll positions; a following
        // view re-pins to the bottom at render time by construction.
        log.enforce_line_bound();
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generation::Generation;

    fn pipeline(
        max_lines: usize,
        batch: usize,
    ) -> (
        Arc<EventQueue>,
        Arc<GenerationCounter>,
        SharedDisplayLog,
        DisplayConsumer,
    ) {
        let queue = Arc::new(EventQueue::new());
        let generations = Arc::new(GenerationCounter::new());
        let log: SharedDisplayLog = Arc::new(Mutex::new(DisplayLog::new(max_lines)));
        let consumer = DisplayConsumer::new(
            Arc::clone(&queue),
            Arc::clone(&generations),
            Arc::clone(&log),
            batch,
        );
        (queue, generations, log, consumer)
    }

    fn new_turn(generation: Generation, question: &str) -> AnswerEvent {
        AnswerEvent::NewTurn {
            generation,
            question: question.to_string(),
        }
    }

    fn token(generation: Generation, text: &str) -> AnswerEvent {
        AnswerEvent::Token {
            generation,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_applies_current_generation_events() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "What is etcd?"));
        queue.push(token(g1, "A key-value store."));

        assert_eq!(consumer.tick(), 2);
        assert_eq!(lock(&log).text(), "What is etcd?\nA key-value store.");
    }

    #[test]
    fn test_stale_events_are_silently_dropped() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        let g2 = generations.advance();

        // Arbitrary interleaving of a stale and a current producer.
        queue.push(token(g1, "STALE "));
        queue.push(new_turn(g2, "Current?"));
        queue.push(token(g1, "MORE STALE"));
        queue.push(token(g2, "fresh"));

        assert_eq!(consumer.tick(), 2);
        let text = lock(&log).text();
        assert!(!text.contains("STALE"));
        assert_eq!(text, "Current?\nfresh");
    }

    #[test]
    fn test_remove_last_turn_rolls_back_partial_output() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "First?"));
        queue.push(token(g1, "Done answer.\n"));
        consumer.tick();

        let g2 = generations.advance();
        queue.push(new_turn(g2, "Second?"));
        queue.push(token(g2, "partial"));
        consumer.tick();
        let before_rollback = lock(&log).text();
        assert!(before_rollback.contains("partial"));

        // Preemption: drain, then roll back the orphaned turn.
        let g3 = generations.advance();
        queue.clear();
        queue.push(AnswerEvent::RemoveLastTurn { generation: g3 });
        consumer.tick();

        assert_eq!(lock(&log).text(), "First?\nDone answer.\n");
    }

    #[test]
    fn test_remove_last_turn_skips_turn_that_never_displayed() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Finished?"));
        queue.push(token(g1, "Committed answer.\n"));
        consumer.tick();

        // g2's NewTurn was drained before the consumer ever saw it; the
        // rollback for its preemption must not eat the finished turn.
        let _g2 = generations.advance();
        let g3 = generations.advance();
        queue.push(AnswerEvent::RemoveLastTurn { generation: g3 });
        consumer.tick();

        assert_eq!(lock(&log).text(), "Finished?\nCommitted answer.\n");
    }

    #[test]
    fn test_remove_last_turn_skips_errored_turn() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Failing?"));
        queue.push(token(g1, "partial"));
        queue.push(AnswerEvent::Error {
            generation: g1,
            message: "boom".to_string(),
        });
        consumer.tick();

        let g2 = generations.advance();
        queue.push(AnswerEvent::RemoveLastTurn { generation: g2 });
        consumer.tick();

        // The errored turn terminated on screen and stays there.
        let text = lock(&log).text();
        assert!(text.contains("partial"));
        assert!(text.contains("[answer error: boom]"));
    }

    #[test]
    fn test_at_most_one_uncommitted_turn_visible() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        for i in 0..3 {
            let g = generations.advance();
            if i > 0 {
                queue.clear();
                queue.push(AnswerEvent::RemoveLastTurn { generation: g });
            }
            queue.push(new_turn(g, &format!("Question {i}?")));
            queue.push(token(g, "partial answer"));
            consumer.tick();
        }

        let log = lock(&log);
        let questions = log
            .spans()
            .iter()
            .filter(|s| s.style == SpanStyle::Question)
            .count();
        assert_eq!(questions, 1);
        assert!(log.text().contains("Question 2?"));
    }

    #[test]
    fn test_error_event_appends_notice_after_partial_text() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Plan?"));
        queue.push(token(g1, "Run terraform"));
        queue.push(AnswerEvent::Error {
            generation: g1,
            message: "stream reset".to_string(),
        });
        consumer.tick();

        let text = lock(&log).text();
        assert_eq!(text, "Plan?\nRun terraform\n[answer error: stream reset]\n");
    }

    #[test]
    fn test_clear_all_wipes_the_log() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Anything?"));
        queue.push(token(g1, "yes"));
        queue.push(AnswerEvent::ClearAll { generation: g1 });
        consumer.tick();

        assert_eq!(lock(&log).text(), "");
    }

    #[test]
    fn test_batch_size_bounds_per_tick_work() {
        let (queue, generations, log, mut consumer) = pipeline(1000, 2);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Q?"));
        for _ in 0..5 {
            queue.push(token(g1, "t"));
        }

        assert_eq!(consumer.tick(), 2);
        assert_eq!(queue.len(), 4);
        // Remaining events arrive on later ticks.
        consumer.tick();
        consumer.tick();
        assert_eq!(consumer.tick(), 0);
        assert!(lock(&log).text().ends_with("ttttt"));
    }

    #[test]
    fn test_display_growth_is_bounded() {
        let (queue, generations, log, mut consumer) = pipeline(10, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "Long one?"));
        for i in 0..50 {
            queue.push(token(g1, &format!("line {i}\n")));
            consumer.tick();
        }

        assert!(lock(&log).line_count() <= 10);
    }

    #[test]
    fn test_code_fence_tokens_get_code_style() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        queue.push(new_turn(g1, "How?"));
        queue.push(token(g1, "Do:\n```bash\n"));
        queue.push(token(g1, "terraform apply\n"));
        queue.push(token(g1, "```\nand wait.\n"));
        consumer.tick();

        let log = lock(&log);
        let code: String = log
            .spans()
            .iter()
            .filter(|s| s.style == SpanStyle::Code)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(code, "terraform apply\n");
        assert!(!log.text().contains("```"));
        assert!(!log.text().contains("bash\n"));
    }

    #[test]
    fn test_stale_new_turn_does_not_reset_live_fence_state() {
        let (queue, generations, log, mut consumer) = pipeline(100, 64);
        let g1 = generations.advance();
        let g2 = generations.advance();
        queue.push(new_turn(g2, "Code?"));
        queue.push(token(g2, "```\ninside\n"));
        consumer.tick();

        // A trailing NewTurn from the superseded g1 worker lands late; it
        // must not touch the live turn's fence state.
        queue.push(new_turn(g1, "stale"));
        queue.push(token(g2, "more code\n"));
        consumer.tick();

        let log = lock(&log);
        let last = log.spans().last().unwrap();
        assert_eq!(last.style, SpanStyle::Code);
        assert!(last.text.ends_with("more code\n"));
    }
}
