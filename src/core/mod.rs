//! The turn-coordination pipeline.
//!
//! Generation-tagged cancellation, the worker/consumer event queue, and the
//! bounded conversation history. Display-side consumption lives in
//! [`crate::ui`].

pub mod events;
pub mod generation;
pub mod history;
pub mod queue;
pub mod turn;
pub mod worker;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
