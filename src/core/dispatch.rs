//! # Dispatch loop: event queue drain and subscriber fan-out.
//!
//! The dispatch loop is one of the manager's two long-lived tasks. It parks
//! on the event queue's wake signal, and on every wake-up drains the whole
//! queue in FIFO order, delivering each event to the mailboxes of its type's
//! subscribers.
//!
//! ```text
//! emit(event) ── push + signal ──► [event queue]
//!                                       │ drain (FIFO)
//!                                       ▼
//!                              routing snapshot by type
//!                         ┌───────────┼───────────┐
//!                         ▼           ▼           ▼
//!                    mailbox S1   mailbox S2   mailbox SN
//!                 (emitter's own mailbox skipped)
//! ```
//!
//! ## Rules
//! - Events of one type reach subscribers in subscription order; events are
//!   dispatched in emission order.
//! - An event is never echoed back to its own emitter.
//! - The routing lock is released before any delivery; a slow mailbox only
//!   costs its own queue lock.
//! - Cancellation wakes the park immediately; the backlog is drained once
//!   more before the loop exits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::LoopSide;
use crate::events::Event;

use super::manager::ManagerInner;

/// FIFO of events awaiting dispatch, with a wake signal.
///
/// The signal retains one permit when nobody is parked, so events queued
/// before the loop starts (or between drains) are picked up on the next wait.
#[derive(Default)]
pub(crate) struct EventQueue {
    queue: Mutex<VecDeque<Arc<Event>>>,
    signal: Notify,
}

impl EventQueue {
    /// Appends an event and wakes the dispatch loop.
    pub(crate) fn push(&self, event: Arc<Event>) {
        self.lock().push_back(event);
        self.signal.notify_one();
    }

    /// Pops the oldest queued event.
    pub(crate) fn pop(&self) -> Option<Arc<Event>> {
        self.lock().pop_front()
    }

    /// Parks until the next wake signal.
    pub(crate) async fn wait(&self) {
        self.signal.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Event>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of the dispatch loop task.
///
/// Holds the manager state only weakly: when the last external handle is
/// dropped the upgrade fails and the loop winds down on its own.
pub(crate) async fn run(
    inner: Weak<ManagerInner>,
    events: Arc<EventQueue>,
    token: CancellationToken,
) {
    match inner.upgrade() {
        Some(strong) => strong.mark_running(LoopSide::Dispatch, true),
        None => return,
    }

    loop {
        let stopping = tokio::select! {
            _ = token.cancelled() => true,
            _ = events.wait() => false,
        };

        let Some(strong) = inner.upgrade() else { break };
        while let Some(event) = events.pop() {
            dispatch_one(&strong, &event);
        }
        drop(strong);

        if stopping {
            break;
        }
    }

    if let Some(strong) = inner.upgrade() {
        strong.mark_running(LoopSide::Dispatch, false);
    }
}

/// Fans one event out to the subscribers of its type.
///
/// Takes a snapshot of the routing entry, so no manager lock is held while
/// mailboxes are filled. The subscriber whose id matches the event's emitter
/// is skipped (self-echo suppression).
fn dispatch_one(inner: &ManagerInner, event: &Arc<Event>) {
    let subscribers = inner.routing.subscribers_of(event.event_type());
    let emitter = event.emitter();

    for subscriber in subscribers {
        if emitter == Some(subscriber.endpoint().id()) {
            continue;
        }
        subscriber.endpoint().deliver(Arc::clone(event));
    }
}
