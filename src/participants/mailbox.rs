//! # Mailbox: the per-participant inbound event queue.
//!
//! Every participant owns exactly one [`Mailbox`]. The manager's dispatch
//! loop pushes events in through [`Mailbox::deliver`]; the participant drains
//! them on its own schedule through the lock/fetch/wait protocol.
//!
//! ## Protocol
//! ```text
//! dispatch loop                      participant (inside schedule())
//!   deliver(event) ── push ──► [queue] ◄── lock() ── MailboxGuard::fetch()
//!                     └─ signal ──► wait_for_event() / wait_for_event_timeout()
//! ```
//!
//! ## Rules
//! - **Delivery never blocks** beyond the queue lock; the dispatcher is never
//!   held hostage by a slow participant.
//! - **FIFO per mailbox**: events come out in delivery order.
//! - **Fetching requires the lock**: [`MailboxGuard::fetch`] only exists on
//!   the guard returned by [`Mailbox::lock`], so fetching from an unlocked
//!   queue is unrepresentable.
//! - **The guard is held briefly**: it is a plain mutex guard and cannot be
//!   held across an `.await`, which keeps queue sections short.
//!
//! The wait calls park the caller until a delivery signal arrives. A signal
//! sent while nobody waits is retained, so an event delivered just before the
//! wait does not strand the waiter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;

use crate::events::Event;

/// Inbound event queue with a delivery signal.
///
/// Owned exclusively by one participant; filled by the manager's dispatch
/// loop, drained by the participant.
#[derive(Default)]
pub struct Mailbox {
    /// Queued events, oldest first.
    queue: Mutex<VecDeque<Arc<Event>>>,
    /// Woken on every delivery.
    signal: Notify,
}

impl Mailbox {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and signals any waiter.
    ///
    /// Called by the manager's dispatch loop; safe to call from any task.
    pub fn deliver(&self, event: Arc<Event>) {
        self.lock_inner().push_back(event);
        self.signal.notify_one();
    }

    /// Non-blocking check for queued events.
    ///
    /// Locks the queue briefly. Inside a locked section prefer
    /// [`MailboxGuard::has_events`], which checks without re-locking.
    pub fn has_events(&self) -> bool {
        !self.lock_inner().is_empty()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.lock_inner().len()
    }

    /// True if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the queue for draining.
    ///
    /// The returned guard is the only handle that can fetch events; drop it
    /// to unlock.
    pub fn lock(&self) -> MailboxGuard<'_> {
        MailboxGuard {
            queue: self.lock_inner(),
        }
    }

    /// Suspends until a delivery is signaled, then returns the locked queue
    /// for immediate fetching.
    pub async fn wait_for_event(&self) -> MailboxGuard<'_> {
        self.signal.notified().await;
        self.lock()
    }

    /// Like [`wait_for_event`](Self::wait_for_event), but gives up after
    /// `timeout`.
    ///
    /// Returns `Some(guard)` when woken by a delivery signal (queue locked),
    /// or `None` on timeout (queue untouched).
    pub async fn wait_for_event_timeout(&self, timeout: Duration) -> Option<MailboxGuard<'_>> {
        match time::timeout(timeout, self.signal.notified()).await {
            Ok(()) => Some(self.lock()),
            Err(_) => None,
        }
    }

    /// A poisoned queue lock only means a holder panicked mid-drain; the
    /// queue itself stays coherent, so keep serving it.
    fn lock_inner(&self) -> MutexGuard<'_, VecDeque<Arc<Event>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Locked view of a [`Mailbox`], able to fetch events.
///
/// Holding the guard excludes concurrent delivery; drop it as soon as the
/// drain section is done.
pub struct MailboxGuard<'a> {
    queue: MutexGuard<'a, VecDeque<Arc<Event>>>,
}

impl MailboxGuard<'_> {
    /// Pops the oldest queued event, or `None` when the queue is drained.
    pub fn fetch(&mut self) -> Option<Arc<Event>> {
        self.queue.pop_front()
    }

    /// Checks for queued events without re-locking.
    pub fn has_events(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn delivery_preserves_fifo_order() {
        let mailbox = Mailbox::new();
        let first = Arc::new(Event::new(1));
        let second = Arc::new(Event::new(1));
        let third = Arc::new(Event::new(1));

        mailbox.deliver(first.clone());
        mailbox.deliver(second.clone());
        mailbox.deliver(third.clone());
        assert_eq!(mailbox.len(), 3);

        let mut guard = mailbox.lock();
        assert_eq!(guard.fetch().unwrap().id(), first.id());
        assert_eq!(guard.fetch().unwrap().id(), second.id());
        assert_eq!(guard.fetch().unwrap().id(), third.id());
        assert!(guard.fetch().is_none());
        assert!(!guard.has_events());
    }

    #[test]
    fn has_events_reflects_queue_state() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.has_events());
        mailbox.deliver(Arc::new(Event::new(5)));
        assert!(mailbox.has_events());
    }

    #[tokio::test]
    async fn wait_times_out_on_idle_mailbox() {
        let mailbox = Mailbox::new();
        let woken = mailbox
            .wait_for_event_timeout(Duration::from_millis(20))
            .await;
        assert!(woken.is_none());
    }

    #[tokio::test]
    async fn wait_observes_prior_delivery() {
        // The delivery signal is retained, so a deliver that races ahead of
        // the wait still wakes it.
        let mailbox = Mailbox::new();
        mailbox.deliver(Arc::new(Event::new(5)));

        let mut guard = mailbox
            .wait_for_event_timeout(Duration::from_millis(100))
            .await
            .expect("delivery signal should wake the waiter");
        assert!(guard.fetch().is_some());
    }

    #[tokio::test]
    async fn wait_wakes_on_concurrent_delivery() {
        let mailbox = Arc::new(Mailbox::new());

        let producer = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(10)).await;
                mailbox.deliver(Arc::new(Event::new(9)));
            })
        };

        let mut guard = mailbox.wait_for_event().await;
        assert_eq!(guard.fetch().unwrap().event_type(), 9);
        producer.await.unwrap();
    }
}
