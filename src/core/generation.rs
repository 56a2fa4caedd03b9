//! Generation ids for latest-only answer turns.
//!
//! Every answer attempt is tagged with a monotonically increasing generation.
//! Advancing the counter is the whole cancellation *intent*: everything tagged
//! with an older generation is permanently stale and gets dropped at the queue
//! and consumer layers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque id for one question/answer attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true if `self` is the generation immediately after `other`.
    ///
    /// Every accepted question advances the counter by exactly one, so the
    /// turn a preemption interrupted is always the direct predecessor of the
    /// generation that preempted it.
    pub fn follows(self, other: Generation) -> bool {
        self.0 == other.0.wrapping_add(1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared counter tracking the single current generation.
///
/// Generation 0 means "no turn yet"; `advance` hands out 1, 2, 3, …
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current generation.
    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    /// Starts a new generation and returns it.
    ///
    /// This atomically invalidates every previously issued generation.
    pub fn advance(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns true if `generation` is still the current one.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::SeqCst) == generation.0
    }
}
