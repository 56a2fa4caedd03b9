//! The answer event queue between workers and the display consumer.
//!
//! Unbounded FIFO with a single consumer and short-lived producers. At most
//! one producer is *active* at a time, but a just-superseded worker may still
//! enqueue one trailing event before it notices it is stale; the consumer's
//! apply-time generation check handles that case.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::events::AnswerEvent;

/// Thread-safe FIFO of display events.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<AnswerEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AnswerEvent>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an event at the back of the queue.
    pub fn push(&self, event: AnswerEvent) {
        self.lock().push_back(event);
    }

    /// Removes and returns up to `max` events from the front.
    ///
    /// The batch bound keeps consumer latency predictable under token bursts.
    pub fn drain_batch(&self, max: usize) -> Vec<AnswerEvent> {
        let mut inner = self.lock();
        let count = inner.len().min(max);
        inner.drain(..count).collect()
    }

    /// Discards every buffered event, regardless of generation.
    ///
    /// This is the controller's preemption drain — the only removal that is
    /// not FIFO. Returns the number of events discarded.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let count = inner.len();
        inner.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
