//! # Manager: routing, queues, and the two processing loops.
//!
//! The [`Manager`] owns the routing table, the event queue, the command
//! queue, the scheduling set, and the participant registry, and runs the two
//! long-lived loops that drive them.
//!
//! ## High-level architecture
//! ```text
//! caller tasks                         manager tasks
//!   emit() ── push + signal ─────────► dispatch loop ── deliver ──► mailboxes
//!   subscribe()/unsubscribe() ──────► [routing table]  (direct, own lock)
//!   connect()/disconnect() ─┐
//!   schedule()/unschedule() ┴ push ─► [command queue] ──► scheduling loop
//!                                          (applied after every tick)
//! ```
//!
//! ## Rules
//! - Every collection has its own lock; no lock is held across a call into
//!   participant code. Re-entrant calls from `init()`/`schedule()` back into
//!   the manager cannot deadlock.
//! - Subscriptions mutate the routing table immediately. Structural changes
//!   (connect/disconnect/scheduling) only enqueue commands; the scheduling
//!   loop is the single task that applies them.
//! - `emit` is fire-and-forget: it never waits for delivery.
//! - The loops hold the manager state weakly. Dropping the last [`Manager`]
//!   handle cancels both loop tokens and lets the tasks wind down on their
//!   own; a started manager does not outlive its handles.
//!
//! ## Start/stop handshake
//! `start()` spawns the dispatch loop and polls until it reports running
//! (`poll` granularity, `handshake` ceiling), then does the same for the
//! scheduling loop; if the second loop fails to come up, the first is stopped
//! before the error propagates. `stop()` cancels both tokens (the
//! cancellation wakes the dispatch loop's park) and polls the flags down
//! under the same protocol. Exceeding a ceiling is a fatal configuration
//! error, surfaced as a [`RuntimeError`] and never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{LoopSide, ParticipantError, RuntimeError};
use crate::events::{Event, EventType};
use crate::participants::Participant;

use super::command::{Command, CommandQueue};
use super::config::ManagerConfig;
use super::dispatch::{self, EventQueue};
use super::registry::Registry;
use super::routing::RoutingTable;
use super::scheduler::{self, SchedulingSet};

/// The central dispatcher: routes typed events between connected
/// participants and schedules periodic work for those that request it.
///
/// `Manager` is a cheap-clone handle; clones share one dispatcher. Create it,
/// [`connect`](Manager::connect) participants (before or after starting,
/// both orders work), then [`start`](Manager::start) the loops.
///
/// See the crate-level docs for a complete walkthrough.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

impl Manager {
    /// Creates a manager with the default timing configuration.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Creates a manager with custom timing.
    pub fn with_config(cfg: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                cfg,
                routing: RoutingTable::default(),
                events: Arc::new(EventQueue::default()),
                commands: CommandQueue::default(),
                scheduling: SchedulingSet::default(),
                registry: Registry::default(),
                dispatch: LoopControl::default(),
                scheduler: LoopControl::default(),
            }),
        }
    }

    // ---------------------------
    // Loop lifecycle
    // ---------------------------

    /// Starts the dispatch loop, then the scheduling loop.
    ///
    /// Each spawn is followed by a polling handshake (`poll` granularity,
    /// `handshake` ceiling). If the scheduling loop fails to start, the
    /// dispatch loop is stopped again before the error is returned.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.start_dispatch().await?;
        if let Err(err) = self.start_scheduling().await {
            let _ = self.stop_loop(LoopSide::Dispatch).await;
            return Err(err);
        }
        Ok(())
    }

    /// Signals both loops to exit and waits for them under the handshake
    /// protocol.
    ///
    /// Stopping a manager that is not running is a no-op. Queued events
    /// survive a stop and are dispatched after a restart.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.stop_loop(LoopSide::Dispatch).await?;
        self.stop_loop(LoopSide::Scheduling).await
    }

    /// True only if both loops report running.
    pub fn is_running(&self) -> bool {
        self.inner.dispatch.is_running() && self.inner.scheduler.is_running()
    }

    // ---------------------------
    // Events
    // ---------------------------

    /// Queues an event for dispatch and wakes the dispatch loop.
    ///
    /// Fire-and-forget: returns immediately, never waits for delivery.
    /// Events emitted this way carry no emitter and reach every subscriber of
    /// their type; use [`Endpoint::emit`](crate::Endpoint::emit) to emit on
    /// behalf of a participant with self-echo suppression.
    pub fn emit(&self, event: impl Into<Arc<Event>>) {
        self.inner.events.push(event.into());
    }

    // ---------------------------
    // Subscriptions (direct, idempotent)
    // ---------------------------

    /// Subscribes `participant` to `event_type`.
    ///
    /// Applied immediately under the routing-table lock; subscribing twice
    /// leaves a single entry.
    pub fn subscribe(&self, event_type: EventType, participant: Arc<dyn Participant>) {
        self.inner.routing.subscribe(event_type, &participant);
    }

    /// Unsubscribes `participant` from `event_type` (no-op if absent).
    pub fn unsubscribe(&self, event_type: EventType, participant: Arc<dyn Participant>) {
        self.inner.routing.unsubscribe(event_type, &participant);
    }

    /// Unsubscribes `participant` from every event type.
    pub fn unsubscribe_all(&self, participant: Arc<dyn Participant>) {
        self.inner.routing.unsubscribe_all(&participant);
    }

    // ---------------------------
    // Structural changes (deferred to the scheduling loop)
    // ---------------------------

    /// Requests that `participant` be connected.
    ///
    /// Enqueues a CONNECT command; the scheduling loop assigns the id,
    /// installs the manager link, registers the participant, and runs its
    /// `init()`, in that order, after its next tick.
    pub fn connect(&self, participant: Arc<dyn Participant>) {
        self.inner.commands.push(Command::Connect(participant));
    }

    /// Requests that `participant` be disconnected.
    ///
    /// The scheduling loop disables its scheduling, removes it from every
    /// routing entry, deregisters it, and detaches its manager link.
    pub fn disconnect(&self, participant: Arc<dyn Participant>) {
        self.inner.commands.push(Command::Disconnect(participant));
    }

    /// Requests periodic `schedule()` calls for `participant`.
    pub fn schedule(&self, participant: Arc<dyn Participant>) {
        self.inner.commands.push(Command::EnableScheduling(participant));
    }

    /// Requests that periodic scheduling stop for `participant`.
    pub fn unschedule(&self, participant: Arc<dyn Participant>) {
        self.inner.commands.push(Command::DisableScheduling(participant));
    }

    // ---------------------------
    // Quiescence
    // ---------------------------

    /// True once the command queue has drained and every routing entry is
    /// empty.
    ///
    /// A quiescence check, not a live predicate: it waits (at `poll`
    /// granularity) for pending commands to be applied before inspecting the
    /// routing table, so it carries an inherent observation delay. While the
    /// scheduling loop is not running, pending commands cannot drain and the
    /// manager is reported non-empty right away.
    pub async fn empty(&self) -> bool {
        loop {
            if self.inner.commands.is_empty() {
                break;
            }
            if !self.inner.scheduler.is_running() {
                return false;
            }
            time::sleep(self.inner.cfg.poll_clamped()).await;
        }
        self.inner.routing.all_empty()
    }

    /// Polls [`empty`](Manager::empty) until it reports true or `timeout`
    /// elapses; returns whether the manager became empty in time.
    pub async fn wait_empty(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.empty().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(self.inner.cfg.poll_clamped()).await;
        }
    }

    // ---------------------------
    // Internals
    // ---------------------------

    async fn start_dispatch(&self) -> Result<(), RuntimeError> {
        let weak = Arc::downgrade(&self.inner);
        let events = Arc::clone(&self.inner.events);
        self.start_loop(LoopSide::Dispatch, move |token| {
            tokio::spawn(dispatch::run(weak, events, token))
        })
        .await
    }

    async fn start_scheduling(&self) -> Result<(), RuntimeError> {
        let weak = Arc::downgrade(&self.inner);
        self.start_loop(LoopSide::Scheduling, move |token| {
            tokio::spawn(scheduler::run(weak, token))
        })
        .await
    }

    async fn start_loop<F>(&self, side: LoopSide, spawn: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()>,
    {
        let control = self.inner.control(side);
        if control.is_running() {
            return Err(RuntimeError::AlreadyRunning { side });
        }

        let token = CancellationToken::new();
        let handle = spawn(token.clone());
        control.arm(token, handle);

        if !self.await_running(control, true).await {
            control.cancel();
            return Err(RuntimeError::StartTimeout {
                side,
                ceiling: self.inner.cfg.handshake,
            });
        }
        Ok(())
    }

    async fn stop_loop(&self, side: LoopSide) -> Result<(), RuntimeError> {
        let control = self.inner.control(side);
        control.cancel();

        if !self.await_running(control, false).await {
            return Err(RuntimeError::StopTimeout {
                side,
                ceiling: self.inner.cfg.handshake,
            });
        }

        if let Some(handle) = control.take_handle() {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Polls a loop's running flag toward `expected`; false when the
    /// handshake ceiling is exceeded.
    async fn await_running(&self, control: &LoopControl, expected: bool) -> bool {
        let deadline = Instant::now() + self.inner.cfg.handshake;
        let poll = self.inner.cfg.poll_clamped();

        while control.is_running() != expected {
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(poll).await;
        }
        true
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared dispatcher state; the loops reference it weakly.
pub(crate) struct ManagerInner {
    pub(crate) cfg: ManagerConfig,
    pub(crate) routing: RoutingTable,
    pub(crate) events: Arc<EventQueue>,
    pub(crate) commands: CommandQueue,
    pub(crate) scheduling: SchedulingSet,
    pub(crate) registry: Registry,
    dispatch: LoopControl,
    scheduler: LoopControl,
}

impl ManagerInner {
    pub(crate) fn mark_running(&self, side: LoopSide, value: bool) {
        self.control(side).set_running(value);
    }

    fn control(&self, side: LoopSide) -> &LoopControl {
        match side {
            LoopSide::Dispatch => &self.dispatch,
            LoopSide::Scheduling => &self.scheduler,
        }
    }
}

impl Drop for ManagerInner {
    /// Cancels both loop tokens so tasks parked on a wait wind down instead
    /// of idling forever after the last handle is gone.
    fn drop(&mut self) {
        self.dispatch.cancel();
        self.scheduler.cancel();
    }
}

/// A participant's weak link back to its manager, installed while the
/// CONNECT command is processed.
///
/// Carries both the manager state and the participant's own identity (the
/// original design's self-referential pointer, made explicit), so an
/// endpoint can subscribe or enqueue commands naming itself. Every call
/// reports [`ParticipantError::Detached`] once the manager is gone.
#[derive(Clone)]
pub(crate) struct ManagerLink {
    manager: Weak<ManagerInner>,
    me: Weak<dyn Participant>,
}

impl ManagerLink {
    pub(crate) fn new(manager: Weak<ManagerInner>, me: Weak<dyn Participant>) -> Self {
        Self { manager, me }
    }

    pub(crate) fn subscribe(&self, event_type: EventType) -> Result<(), ParticipantError> {
        self.manager()?.routing.subscribe(event_type, &self.me()?);
        Ok(())
    }

    pub(crate) fn unsubscribe(&self, event_type: EventType) -> Result<(), ParticipantError> {
        self.manager()?.routing.unsubscribe(event_type, &self.me()?);
        Ok(())
    }

    pub(crate) fn unsubscribe_all(&self) -> Result<(), ParticipantError> {
        self.manager()?.routing.unsubscribe_all(&self.me()?);
        Ok(())
    }

    pub(crate) fn emit(&self, event: Arc<Event>) -> Result<(), ParticipantError> {
        self.manager()?.events.push(event);
        Ok(())
    }

    pub(crate) fn enable_scheduling(&self) -> Result<(), ParticipantError> {
        self.push_command(Command::EnableScheduling(self.me()?))
    }

    pub(crate) fn disable_scheduling(&self) -> Result<(), ParticipantError> {
        self.push_command(Command::DisableScheduling(self.me()?))
    }

    pub(crate) fn connect(&self, other: Arc<dyn Participant>) -> Result<(), ParticipantError> {
        self.push_command(Command::Connect(other))
    }

    pub(crate) fn disconnect(&self, other: Arc<dyn Participant>) -> Result<(), ParticipantError> {
        self.push_command(Command::Disconnect(other))
    }

    fn push_command(&self, command: Command) -> Result<(), ParticipantError> {
        self.manager()?.commands.push(command);
        Ok(())
    }

    fn manager(&self) -> Result<Arc<ManagerInner>, ParticipantError> {
        self.manager.upgrade().ok_or(ParticipantError::Detached)
    }

    fn me(&self) -> Result<Arc<dyn Participant>, ParticipantError> {
        self.me.upgrade().ok_or(ParticipantError::Detached)
    }
}

/// Start/stop state of one processing loop.
#[derive(Default)]
struct LoopControl {
    /// Set by the loop body at entry and exit.
    running: AtomicBool,
    /// Cancelled to ask the loop to exit.
    token: Mutex<CancellationToken>,
    /// Join handle of the current task, taken on stop.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LoopControl {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Release);
    }

    fn arm(&self, token: CancellationToken, handle: JoinHandle<()>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn cancel(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    fn take_handle(&self) -> Option<JoinHandle<()>> {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
