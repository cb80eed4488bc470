//! # Endpoint: a participant's link into the event system.
//!
//! The [`Endpoint`] carries everything a concrete participant needs to act on
//! the bus: the manager link (set by the manager while the CONNECT command is
//! processed, cleared on DISCONNECT), the administrative id, the
//! scheduling-request flag, and the inbound [`Mailbox`].
//!
//! ## Outward calls
//! Subscribing, emitting, requesting scheduling, and connecting or
//! disconnecting *other* participants all go through the attached manager.
//! On a detached endpoint every one of them fails with
//! [`ParticipantError::Detached`].
//!
//! ## Rules
//! - The manager link is a weak handle: an endpoint never keeps its manager
//!   alive, and a call made after the manager was dropped reports
//!   [`ParticipantError::Detached`].
//! - `subscribe`/`unsubscribe` take effect immediately (the routing table's
//!   own lock serializes them against dispatch). `enable_scheduling`,
//!   `disable_scheduling`, `connect`, and `disconnect` only enqueue commands;
//!   the scheduling loop applies them after its next tick.
//! - Attaching auto-subscribes the participant to
//!   [`EVENT_TYPE_SHUTDOWN`](crate::EVENT_TYPE_SHUTDOWN); detaching does not
//!   resubscribe anything.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::core::ManagerLink;
use crate::error::ParticipantError;
use crate::events::{Event, EventType, EVENT_TYPE_SHUTDOWN};

use super::{Mailbox, MailboxGuard, Participant};

/// Participant-side state: manager link, id, scheduling flag, mailbox.
///
/// Concrete participants embed one `Endpoint` and hand out `&Endpoint`
/// through [`Participant::endpoint`]. The endpoint is constructed detached;
/// it becomes active when the manager processes the CONNECT command and inert
/// again after DISCONNECT.
#[derive(Default)]
pub struct Endpoint {
    /// Link to the owning manager; `None` while disconnected.
    link: RwLock<Option<ManagerLink>>,
    /// Administrative id, assigned by the manager at connect time (0 =
    /// unassigned). Kept after disconnect.
    id: AtomicU32,
    /// Mirrors whether an enable-scheduling request has been issued.
    scheduled: AtomicBool,
    /// Inbound event queue.
    mailbox: Mailbox,
}

impl Endpoint {
    /// Creates a detached endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrative id assigned at connect time; 0 while never connected.
    ///
    /// Ids are unique among currently connected participants, monotonically
    /// increasing, and never reused while the manager lives.
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    /// True while a manager is attached.
    pub fn is_attached(&self) -> bool {
        self.read_link().is_some()
    }

    /// True if this participant has requested periodic scheduling.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    // ---------------------------
    // Subscription management
    // ---------------------------

    /// Subscribes this participant to an event type.
    ///
    /// Idempotent: subscribing twice leaves a single routing entry.
    pub fn subscribe(&self, event_type: EventType) -> Result<(), ParticipantError> {
        self.link()?.subscribe(event_type)
    }

    /// Unsubscribes this participant from an event type (no-op if absent).
    pub fn unsubscribe(&self, event_type: EventType) -> Result<(), ParticipantError> {
        self.link()?.unsubscribe(event_type)
    }

    /// Unsubscribes this participant from every event type.
    pub fn unsubscribe_all(&self) -> Result<(), ParticipantError> {
        self.link()?.unsubscribe_all()
    }

    // ---------------------------
    // Emission and scheduling
    // ---------------------------

    /// Records this participant as the event's emitter and hands it to the
    /// manager for dispatch.
    ///
    /// Fire-and-forget: returns as soon as the event is queued. The dispatch
    /// loop will not echo the event back to this participant.
    pub fn emit(&self, event: impl Into<Arc<Event>>) -> Result<(), ParticipantError> {
        let link = self.link()?;
        let event = event.into();
        event.set_emitter(self.id());
        link.emit(event)
    }

    /// Requests periodic [`schedule`](Participant::schedule) calls for this
    /// participant.
    ///
    /// Enqueues an ENABLE_SCHEDULING command; the scheduling loop applies it
    /// after its next tick.
    pub fn enable_scheduling(&self) -> Result<(), ParticipantError> {
        self.link()?.enable_scheduling()?;
        self.scheduled.store(true, Ordering::Release);
        Ok(())
    }

    /// Requests that periodic scheduling stop for this participant.
    pub fn disable_scheduling(&self) -> Result<(), ParticipantError> {
        self.link()?.disable_scheduling()?;
        self.scheduled.store(false, Ordering::Release);
        Ok(())
    }

    // ---------------------------
    // Nested connection management
    // ---------------------------

    /// Requests that *another* participant be connected, through this
    /// participant's manager.
    pub fn connect(&self, participant: Arc<dyn Participant>) -> Result<(), ParticipantError> {
        self.link()?.connect(participant)
    }

    /// Requests that *another* participant be disconnected, through this
    /// participant's manager.
    pub fn disconnect(&self, participant: Arc<dyn Participant>) -> Result<(), ParticipantError> {
        self.link()?.disconnect(participant)
    }

    // ---------------------------
    // Inbound queue protocol
    // ---------------------------

    /// Delivers an event into this participant's mailbox and signals it.
    ///
    /// Called by the manager's dispatch loop; never blocks beyond the queue
    /// lock.
    pub fn deliver(&self, event: Arc<Event>) {
        self.mailbox.deliver(event);
    }

    /// Non-blocking check for queued events.
    pub fn has_events(&self) -> bool {
        self.mailbox.has_events()
    }

    /// Locks the inbound queue for draining; fetch through the guard.
    pub fn lock_queue(&self) -> MailboxGuard<'_> {
        self.mailbox.lock()
    }

    /// Suspends until an event delivery is signaled; returns the locked queue.
    pub async fn wait_for_event(&self) -> MailboxGuard<'_> {
        self.mailbox.wait_for_event().await
    }

    /// Timed variant of [`wait_for_event`](Self::wait_for_event): `Some`
    /// (queue locked) when signaled, `None` on timeout.
    pub async fn wait_for_event_timeout(&self, timeout: Duration) -> Option<MailboxGuard<'_>> {
        self.mailbox.wait_for_event_timeout(timeout).await
    }

    /// The underlying mailbox.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    // ---------------------------
    // Manager-side lifecycle (crate-internal)
    // ---------------------------

    /// Installs the manager link and auto-subscribes to the shutdown type.
    ///
    /// Called from CONNECT processing, before the id is assigned and before
    /// `init()` runs.
    pub(crate) fn attach(&self, link: ManagerLink) {
        {
            let mut slot = self.write_link();
            *slot = Some(link);
        }
        // Cannot fail: the link was installed just above.
        let _ = self.subscribe(EVENT_TYPE_SHUTDOWN);
    }

    /// Clears the manager link; the endpoint keeps its id but every outward
    /// call fails with [`ParticipantError::Detached`] from now on.
    pub(crate) fn detach(&self) {
        let mut slot = self.write_link();
        *slot = None;
        self.scheduled.store(false, Ordering::Release);
    }

    /// Records the id assigned by the manager.
    pub(crate) fn assign_id(&self, id: u32) {
        self.id.store(id, Ordering::Release);
    }

    fn link(&self) -> Result<ManagerLink, ParticipantError> {
        self.read_link().ok_or(ParticipantError::Detached)
    }

    fn read_link(&self) -> Option<ManagerLink> {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_link(&self) -> std::sync::RwLockWriteGuard<'_, Option<ManagerLink>> {
        self.link.write().unwrap_or_else(PoisonError::into_inner)
    }
}
