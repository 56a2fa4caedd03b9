//! Transcript-source seam.
//!
//! Speech-to-text lives outside the core: interim transcripts are the
//! source's concern, and only *finalized* utterances cross this boundary. The
//! TUI input line feeds a channel-backed source; a real STT transport would
//! implement the same trait.

use tokio::sync::mpsc;

/// Yields finalized utterances, one per spoken turn.
pub trait TranscriptSource: Send {
    /// Waits for the next finalized transcript. `None` means the source is
    /// closed and no further turns will arrive.
    fn next_final(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// Transcript source backed by an in-process channel.
pub struct ChannelTranscriptSource {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelTranscriptSource {
    /// Creates a source plus the sender that feeds it.
    pub fn new() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl TranscriptSource for ChannelTranscriptSource {
    async fn next_final(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
