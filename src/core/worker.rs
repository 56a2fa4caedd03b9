//! The answer worker: one generation's streamed answer.
//!
//! A worker is spawned per finalized question and self-cancels when
//! superseded. Cancellation is cooperative: it takes effect at token
//! boundaries only, so a single in-flight network read may complete after
//! preemption — its output is discarded by the generation checks here and at
//! the consumer.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::events::AnswerEvent;
use crate::core::generation::{Generation, GenerationCounter};
use crate::core::history::ConversationHistory;
use crate::core::queue::EventQueue;
use crate::core::turn::{TurnStatus, TurnStatusCell};
use crate::core::lock;
use crate::prompt::PromptContext;
use crate::providers::CompletionClient;

/// Timeout for stream polling so staleness is re-checked even when the
/// provider stalls between tokens.
const STREAM_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Everything a worker needs, handed over at spawn time.
pub struct AnswerContext {
    pub generation: Generation,
    pub question: String,
    pub generations: Arc<GenerationCounter>,
    pub cancel: CancellationToken,
    pub queue: Arc<EventQueue>,
    pub history: Arc<Mutex<ConversationHistory>>,
    pub client: Arc<dyn CompletionClient>,
    pub prompt: Arc<PromptContext>,
    pub status: Arc<TurnStatusCell>,
}

impl AnswerContext {
    fn is_stale(&self) -> bool {
        !self.generations.is_current(self.generation) || self.cancel.is_cancelled()
    }
}

/// Streams one answer for `ctx.generation`.
///
/// The only state change permitted after going stale is a silent exit; stale
/// provider errors are suppressed entirely.
pub async fn run_answer(ctx: AnswerContext) {
    // Preempted between spawn and first poll.
    if ctx.is_stale() {
        debug!(generation = %ctx.generation, "worker stale before start");
        ctx.status.set(TurnStatus::Discarded);
        return;
    }

    ctx.queue.push(AnswerEvent::NewTurn {
        generation: ctx.generation,
        question: ctx.question.clone(),
    });

    let history_window = lock(&ctx.history).format_for_prompt();
    let request = ctx.prompt.build_request(&ctx.question, &history_window);

    // The opening call can sit for a while before the first byte; keep it
    // interruptible so preemption does not wait on a slow provider.
    let opened = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => {
            debug!(generation = %ctx.generation, "worker cancelled while opening stream");
            ctx.status.set(TurnStatus::Discarded);
            return;
        }
        result = ctx.client.open_token_stream(request) => result,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            fail_turn(&ctx, &e);
            return;
        }
    };

    let mut answer = String::new();
    loop {
        if ctx.is_stale() {
            debug!(generation = %ctx.generation, "worker superseded mid-stream");
            ctx.status.set(TurnStatus::Discarded);
            return;
        }

        let next = timeout(STREAM_POLL_TIMEOUT, stream.next()).await;
        let chunk = match next {
            Ok(Some(Ok(text))) => text,
            Ok(Some(Err(e))) => {
                fail_turn(&ctx, &e);
                return;
            }
            Ok(None) => break,
            Err(_) => continue, // poll timeout; loop to re-check staleness
        };

        if chunk.is_empty() {
            continue;
        }
        answer.push_str(&chunk);
        ctx.queue.push(AnswerEvent::Token {
            generation: ctx.generation,
            text: chunk,
        });
    }

    if ctx.is_stale() {
        debug!(generation = %ctx.generation, "worker superseded at stream end");
        ctx.status.set(TurnStatus::Discarded);
        return;
    }

    if answer.is_empty() {
        debug!(generation = %ctx.generation, "stream ended with no text; nothing committed");
    } else {
        lock(&ctx.history).append(ctx.question.clone(), answer.clone());
        info!(
            generation = %ctx.generation,
            answer_chars = answer.len(),
            "turn committed to history"
        );
    }
    ctx.status.set(TurnStatus::Committed);
}

/// Surfaces a provider failure into the current turn, or swallows it for a
/// stale one.
fn fail_turn(ctx: &AnswerContext, error: &anyhow::Error) {
    if ctx.is_stale() {
        debug!(generation = %ctx.generation, error = %error, "suppressing error from stale turn");
        ctx.status.set(TurnStatus::Discarded);
        return;
    }
    warn!(generation = %ctx.generation, error = %error, "completion stream failed");
    ctx.queue.push(AnswerEvent::Error {
        generation: ctx.generation,
        message: error.to_string(),
    });
    ctx.status.set(TurnStatus::Errored);
}
