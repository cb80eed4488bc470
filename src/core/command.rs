//! Deferred structural-mutation requests.
//!
//! Connect/disconnect and scheduling changes are never applied synchronously:
//! callers enqueue a [`Command`] and the scheduling loop applies the whole
//! queue in FIFO order after each tick. Funneling every structural mutation
//! through that single point keeps them race-free against concurrent
//! dispatch.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::participants::Participant;

/// A structural-mutation request, applied only by the scheduling loop.
pub(crate) enum Command {
    /// Register the participant, assign an id, and run its `init()`.
    Connect(Arc<dyn Participant>),
    /// Unschedule, unsubscribe everywhere, and deregister the participant.
    Disconnect(Arc<dyn Participant>),
    /// Add the participant to the scheduling set (idempotent).
    EnableScheduling(Arc<dyn Participant>),
    /// Remove the participant from the scheduling set (idempotent).
    DisableScheduling(Arc<dyn Participant>),
}

/// FIFO of pending commands with its own lock.
///
/// The lock is never held while a command handler runs, so handlers (and the
/// participant code they call into) can enqueue follow-up commands without
/// deadlocking.
#[derive(Default)]
pub(crate) struct CommandQueue {
    queue: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    pub(crate) fn push(&self, command: Command) {
        self.lock().push_back(command);
    }

    pub(crate) fn pop(&self) -> Option<Command> {
        self.lock().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Command>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
