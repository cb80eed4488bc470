//! # Scheduling loop: periodic ticks and command processing.
//!
//! The scheduling loop is the manager's second long-lived task and its single
//! linearization point for structural mutations. Every iteration:
//!
//! 1. snapshot the scheduling set and call `schedule()` on each member in
//!    insertion order;
//! 2. drain the command queue (CONNECT / DISCONNECT / ENABLE_SCHEDULING /
//!    DISABLE_SCHEDULING) in FIFO order;
//! 3. sleep one tick (cancellably), then repeat.
//!
//! Because only this loop applies commands, connect/disconnect can touch the
//! registry, the scheduling set, and every routing entry without tearing
//! state that the dispatch loop might be reading mid-update.
//!
//! ## Rules
//! - The command-queue lock is released around every handler, so participant
//!   code running inside `init()` may enqueue follow-up commands freely;
//!   they are picked up in the same drain.
//! - Calls into participant code are isolated: an `Err` is logged, a panic is
//!   caught and logged, and the loop carries on. Shared state stays coherent
//!   either way.
//! - A `schedule()` that does not return promptly starves every other
//!   scheduled participant and delays command processing for that tick; that
//!   contract is documented on [`Participant`], not enforced here.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{LoopSide, ParticipantError};
use crate::participants::Participant;

use super::command::Command;
use super::manager::{ManagerInner, ManagerLink};

/// Participants currently eligible for periodic scheduling.
///
/// Insertion-ordered, deduplicated by identity; mutated only from command
/// processing, snapshotted by the tick.
#[derive(Default)]
pub(crate) struct SchedulingSet {
    members: Mutex<Vec<Arc<dyn Participant>>>,
}

impl SchedulingSet {
    /// Adds a participant unless already present.
    pub(crate) fn enable(&self, participant: &Arc<dyn Participant>) {
        let mut members = self.lock();
        if !members.iter().any(|p| Arc::ptr_eq(p, participant)) {
            members.push(Arc::clone(participant));
        }
    }

    /// Removes a participant, if present.
    pub(crate) fn disable(&self, participant: &Arc<dyn Participant>) {
        self.lock().retain(|p| !Arc::ptr_eq(p, participant));
    }

    /// Snapshot of the members in insertion order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Participant>> {
        self.lock().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Participant>>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of the scheduling loop task.
///
/// Holds the manager state only weakly; the loop winds down once the last
/// external handle is dropped or its token is cancelled.
pub(crate) async fn run(inner: Weak<ManagerInner>, token: CancellationToken) {
    match inner.upgrade() {
        Some(strong) => strong.mark_running(LoopSide::Scheduling, true),
        None => return,
    }

    loop {
        let tick = {
            let Some(strong) = inner.upgrade() else { break };

            for participant in strong.scheduling.snapshot() {
                guarded(participant.name(), "schedule", participant.schedule()).await;
            }
            process_commands(&strong).await;

            strong.cfg.tick_clamped()
        };

        tokio::select! {
            _ = token.cancelled() => break,
            _ = time::sleep(tick) => {}
        }
    }

    if let Some(strong) = inner.upgrade() {
        strong.mark_running(LoopSide::Scheduling, false);
    }
}

/// Drains and applies the entire command queue in FIFO order.
///
/// Nested commands enqueued by a handler (e.g. an `init()` that connects a
/// child participant) land on the same queue and are applied in this drain.
pub(crate) async fn process_commands(inner: &Arc<ManagerInner>) {
    while let Some(command) = inner.commands.pop() {
        match command {
            Command::Connect(participant) => process_connect(inner, participant).await,
            Command::Disconnect(participant) => process_disconnect(inner, &participant),
            Command::EnableScheduling(participant) => inner.scheduling.enable(&participant),
            Command::DisableScheduling(participant) => inner.scheduling.disable(&participant),
        }
    }
}

/// Registers a participant and runs its `init()` hook.
///
/// Manager link and id are installed first: `init()` typically subscribes
/// and enables scheduling through that link. Already-registered participants
/// are skipped.
async fn process_connect(inner: &Arc<ManagerInner>, participant: Arc<dyn Participant>) {
    if inner.registry.contains(&participant) {
        return;
    }

    let link = ManagerLink::new(Arc::downgrade(inner), Arc::downgrade(&participant));
    participant.endpoint().attach(link);
    participant.endpoint().assign_id(inner.registry.allocate_id());
    inner.registry.insert(Arc::clone(&participant));

    guarded(participant.name(), "init", participant.init()).await;
}

/// Removes a participant from scheduling, routing, and the registry.
///
/// Scheduling and subscriptions are cleared first, then the registry entry
/// and the manager link, so a disconnected participant can never reappear in
/// a routing lookup or a scheduling tick.
fn process_disconnect(inner: &Arc<ManagerInner>, participant: &Arc<dyn Participant>) {
    inner.scheduling.disable(participant);
    inner.routing.unsubscribe_all(participant);

    if inner.registry.remove(participant) {
        participant.endpoint().detach();
    }
}

/// Invokes one participant hook with panic and error isolation.
async fn guarded<F>(name: &str, hook: &str, call: F)
where
    F: Future<Output = Result<(), ParticipantError>>,
{
    match std::panic::AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            eprintln!("[eventvisor] participant '{name}' {hook} failed: {err}");
        }
        Err(panic_err) => {
            eprintln!("[eventvisor] participant '{name}' panicked during {hook}: {panic_err:?}");
        }
    }
}
