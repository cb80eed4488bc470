//! # Typed events routed through the manager.
//!
//! An [`Event`] is an immutable-after-construction value: a type tag, a random
//! correlation id, optional response linkage to a prior event, and a one-shot
//! emitter cell filled in just before publication. Events are shared as
//! `Arc<Event>` between the emitting task, the dispatch loop, and every
//! subscriber's mailbox.
//!
//! ## Identity
//! The `id` is a uniform random draw over `[1, i32::MAX]` taken at
//! construction. It is used for correlating responses to requests, not as a
//! process-wide unique key; the collision probability over that range is
//! accepted as negligible.
//!
//! ## Example
//! ```
//! use eventvisor::Event;
//!
//! let request = Event::new(10);
//! assert!(!request.is_response());
//! assert!(request.response_id().is_err());
//!
//! let response = Event::response_to(10, &request);
//! assert!(response.is_response());
//! assert_eq!(response.response_id().unwrap(), request.id());
//! ```

use std::sync::OnceLock;

use rand::Rng;

use crate::error::EventError;

/// Application-defined event type tag.
pub type EventType = u32;

/// Event type reserved for the shutdown broadcast.
///
/// Every participant is subscribed to this type automatically as soon as a
/// manager is attached. By convention a participant reacts to it by
/// unsubscribing itself and disabling its own scheduling; the core does not
/// enforce that reaction.
pub const EVENT_TYPE_SHUTDOWN: EventType = 0;

/// A typed, identified message broadcast through the manager.
///
/// Constructed once per logical event (and once more per response), then
/// shared by reference among all tasks that read it. Nothing is mutated after
/// construction except the emitter cell, which is written at most once before
/// the event is first published.
#[derive(Debug)]
pub struct Event {
    /// Application-defined type tag; `0` is reserved for shutdown.
    event_type: EventType,
    /// Random correlation id, drawn at construction.
    id: u64,
    /// Id of the event this one responds to, when constructed as a response.
    response_id: Option<u64>,
    /// Participant id of the emitter, written once before publication.
    emitter: OnceLock<u32>,
}

impl Event {
    /// Creates a plain event of the given type with a fresh random id.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            id: random_id(),
            response_id: None,
            emitter: OnceLock::new(),
        }
    }

    /// Creates a response to `request`.
    ///
    /// The response copies `request.id()` into its response linkage and draws
    /// its own independent random id.
    pub fn response_to(event_type: EventType, request: &Event) -> Self {
        Self {
            response_id: Some(request.id()),
            ..Self::new(event_type)
        }
    }

    /// Returns the type tag of the event.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Returns the correlation id of the event.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True if this event was constructed as a response to another event.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.response_id.is_some()
    }

    /// Returns the id of the event this one responds to.
    ///
    /// Fails with [`EventError::NotAResponse`] on a plain event; reading the
    /// linkage of a non-response is a programming error, not a normal-path
    /// condition.
    pub fn response_id(&self) -> Result<u64, EventError> {
        self.response_id.ok_or(EventError::NotAResponse)
    }

    /// Returns the participant id of the emitter, if one was recorded.
    ///
    /// The dispatch loop uses this to suppress echoing an event back to its
    /// own emitter. Events emitted directly through
    /// [`Manager::emit`](crate::Manager::emit) carry no emitter and are
    /// delivered to every subscriber of their type.
    #[inline]
    pub fn emitter(&self) -> Option<u32> {
        self.emitter.get().copied()
    }

    /// Records the emitter of the event.
    ///
    /// May be called at most once, before the event is shared across tasks;
    /// returns `false` when an emitter was already recorded, leaving the
    /// first value in place. [`Endpoint::emit`](crate::Endpoint::emit) calls
    /// this on behalf of the emitting participant.
    pub fn set_emitter(&self, participant_id: u32) -> bool {
        self.emitter.set(participant_id).is_ok()
    }

    /// True if this is the reserved shutdown event.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.event_type == EVENT_TYPE_SHUTDOWN
    }
}

/// Uniform draw over `[1, i32::MAX]`.
fn random_id() -> u64 {
    rand::rng().random_range(1..=i32::MAX as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_event_has_id_in_range_and_no_response() {
        let event = Event::new(10);
        assert_eq!(event.event_type(), 10);
        assert!(event.id() >= 1);
        assert!(event.id() <= i32::MAX as u64);
        assert!(!event.is_response());
        assert!(event.response_id().is_err());
        assert_eq!(event.emitter(), None);
    }

    #[test]
    fn independent_events_draw_distinct_ids() {
        // Collisions over [1, i32::MAX] are possible but vanishingly unlikely
        // for a handful of draws.
        let ids: Vec<u64> = (0..8).map(|_| Event::new(1).id()).collect();
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }

    #[test]
    fn response_links_to_request_with_fresh_id() {
        let request = Event::new(10);
        let response = Event::response_to(10, &request);

        assert!(response.is_response());
        assert_eq!(response.response_id().unwrap(), request.id());
        assert_ne!(response.id(), request.id());
    }

    #[test]
    fn emitter_is_recorded_once() {
        let event = Event::new(3);
        assert!(event.set_emitter(7));
        assert!(!event.set_emitter(9));
        assert_eq!(event.emitter(), Some(7));
    }

    #[test]
    fn shutdown_type_is_reserved_zero() {
        assert_eq!(EVENT_TYPE_SHUTDOWN, 0);
        assert!(Event::new(EVENT_TYPE_SHUTDOWN).is_shutdown());
        assert!(!Event::new(1).is_shutdown());
    }
}
