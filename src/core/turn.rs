//! Turn coordination: one live answer at a time.
//!
//! The controller owns the generation counter, the event queue, and the
//! conversation history, and serializes turn creation so stale work can never
//! corrupt the display. Preemption is three moves: advance the generation,
//! drain the queue, roll back the orphaned partial turn.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::events::AnswerEvent;
use crate::core::generation::{Generation, GenerationCounter};
use crate::core::history::ConversationHistory;
use crate::core::queue::EventQueue;
use crate::core::worker::{self, AnswerContext};
use crate::prompt::PromptContext;
use crate::providers::CompletionClient;

/// Terminal and in-flight states of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Worker is (or may still be) producing output.
    Pending,
    /// Stream completed while current; committed to history if non-empty.
    Committed,
    /// Superseded; output discarded.
    Discarded,
    /// Provider failure while current.
    Errored,
}

/// Lock-free status cell shared between a worker and the controller.
#[derive(Debug)]
pub struct TurnStatusCell(AtomicU8);

impl TurnStatusCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(TurnStatus::Pending as u8))
    }

    pub fn set(&self, status: TurnStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> TurnStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => TurnStatus::Pending,
            1 => TurnStatus::Committed,
            2 => TurnStatus::Discarded,
            _ => TurnStatus::Errored,
        }
    }
}

impl Default for TurnStatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The controller's record of the live turn.
struct ActiveTurn {
    generation: Generation,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    status: Arc<TurnStatusCell>,
}

/// Tunables for turn creation.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Transcripts shorter than this never start a turn (noise filter).
    pub min_question_chars: usize,
    /// Bounded wait for the previous worker's cooperative exit.
    pub worker_join_timeout: Duration,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            min_question_chars: 20,
            worker_join_timeout: Duration::from_millis(250),
        }
    }
}

/// Serializes question submission and answer-worker lifecycles.
pub struct TurnController {
    generations: Arc<GenerationCounter>,
    queue: Arc<EventQueue>,
    history: Arc<Mutex<ConversationHistory>>,
    client: Arc<dyn CompletionClient>,
    prompt: Arc<PromptContext>,
    settings: TurnSettings,
    active: Option<ActiveTurn>,
}

impl TurnController {
    pub fn new(
        generations: Arc<GenerationCounter>,
        queue: Arc<EventQueue>,
        history: Arc<Mutex<ConversationHistory>>,
        client: Arc<dyn CompletionClient>,
        prompt: Arc<PromptContext>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            generations,
            queue,
            history,
            client,
            prompt,
            settings,
            active: None,
        }
    }

    /// Handles one finalized transcript: preempts any live answer and starts
    /// exactly one new worker.
    ///
    /// Callers are serialized by `&mut self` — one finalized transcript is
    /// processed at a time.
    pub async fn submit_question(&mut self, text: &str) {
        let question = text.trim();
        if question.chars().count() < self.settings.min_question_chars {
            debug!(len = question.chars().count(), "ignoring short transcript");
            return;
        }

        // Advancing the counter is the cancellation intent; everything below
        // is cleanup and restart.
        let generation = self.generations.advance();
        info!(%generation, "starting turn");

        let interrupted = self.stop_active_worker().await;

        let drained = self.queue.clear();
        if drained > 0 {
            debug!(%generation, drained, "drained stale events");
        }

        // Only an interrupted turn left orphaned partial output behind;
        // committed and errored turns ran to completion and stay on screen.
        if interrupted {
            self.queue.push(AnswerEvent::RemoveLastTurn { generation });
        }

        let cancel = CancellationToken::new();
        let status = Arc::new(TurnStatusCell::new());
        let ctx = AnswerContext {
            generation,
            question: question.to_string(),
            generations: Arc::clone(&self.generations),
            cancel: cancel.clone(),
            queue: Arc::clone(&self.queue),
            history: Arc::clone(&self.history),
            client: Arc::clone(&self.client),
            prompt: Arc::clone(&self.prompt),
            status: Arc::clone(&status),
        };
        let handle = tokio::spawn(worker::run_answer(ctx));

        self.active = Some(ActiveTurn {
            generation,
            cancel,
            handle,
            status,
        });
    }

    /// Requests the previous worker stop and waits briefly for it.
    ///
    /// Returns true if that turn never reached natural completion — i.e.
    /// preemption actually interrupted something and its partial display
    /// needs rolling back. The join is best-effort: a worker blocked inside a
    /// single network read keeps running past the timeout and exits on its
    /// own staleness check, reporting `Discarded` — which still counts as
    /// interrupted. It cannot commit or error anymore: the generation has
    /// already advanced, so its endgame checks see stale.
    async fn stop_active_worker(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        active.cancel.cancel();
        if tokio::time::timeout(self.settings.worker_join_timeout, active.handle)
            .await
            .is_err()
        {
            debug!(generation = %active.generation, "previous worker did not exit in time");
        }

        matches!(
            active.status.get(),
            TurnStatus::Pending | TurnStatus::Discarded
        )
    }

    /// Pushes a whole-display clear for the consumer to apply.
    pub fn clear_display(&self) {
        self.queue.push(AnswerEvent::ClearAll {
            generation: self.generations.current(),
        });
    }

    /// Status of the most recently started turn, if any.
    pub fn active_status(&self) -> Option<TurnStatus> {
        self.active.as_ref().map(|a| a.status.get())
    }
}
