//! # Routing table: event type → subscribed participants.
//!
//! Maps each [`EventType`] to the ordered list of participants subscribed to
//! it. Subscriptions mutate the table directly under its own lock; unlike
//! connect/disconnect they need no command-queue detour, because the lock
//! fully serializes them against dispatch-loop reads.
//!
//! ## Rules
//! - Per type, subscribers are kept in subscription order and deduplicated by
//!   identity: subscribing twice is a no-op, unsubscribing an absent entry is
//!   a no-op.
//! - Dispatch takes a snapshot of a type's list and releases the lock before
//!   delivering, so no lock is held across a call into participant code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::EventType;
use crate::participants::Participant;

type SubscriberLists = HashMap<EventType, Vec<Arc<dyn Participant>>>;

/// Lock-guarded subscription table.
#[derive(Default)]
pub(crate) struct RoutingTable {
    entries: Mutex<SubscriberLists>,
}

impl RoutingTable {
    /// Adds `participant` to the list for `event_type` unless already present.
    pub(crate) fn subscribe(&self, event_type: EventType, participant: &Arc<dyn Participant>) {
        let mut entries = self.lock();
        let list = entries.entry(event_type).or_default();
        if !list.iter().any(|p| Arc::ptr_eq(p, participant)) {
            list.push(Arc::clone(participant));
        }
    }

    /// Removes `participant` from the list for `event_type`, if present.
    pub(crate) fn unsubscribe(&self, event_type: EventType, participant: &Arc<dyn Participant>) {
        let mut entries = self.lock();
        if let Some(list) = entries.get_mut(&event_type) {
            list.retain(|p| !Arc::ptr_eq(p, participant));
        }
    }

    /// Removes `participant` from every type's list.
    pub(crate) fn unsubscribe_all(&self, participant: &Arc<dyn Participant>) {
        let mut entries = self.lock();
        for list in entries.values_mut() {
            list.retain(|p| !Arc::ptr_eq(p, participant));
        }
    }

    /// Snapshot of the subscribers for `event_type`, in subscription order.
    pub(crate) fn subscribers_of(&self, event_type: EventType) -> Vec<Arc<dyn Participant>> {
        self.lock()
            .get(&event_type)
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// True if every type's subscriber list is empty.
    pub(crate) fn all_empty(&self) -> bool {
        self.lock().values().all(|list| list.is_empty())
    }

    fn lock(&self) -> MutexGuard<'_, SubscriberLists> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
