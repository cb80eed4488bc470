//! End-to-end scenarios for the manager: connect/start/emit/shutdown flows,
//! self-echo suppression, ordering, and disconnect erasure.
//!
//! Tests run with a fast tick so scenario waits stay in the tens of
//! milliseconds; bounds are generous to stay robust on slow CI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};

use eventvisor::{
    Endpoint, Event, EventType, Manager, ManagerConfig, Participant, ParticipantError,
    EVENT_TYPE_SHUTDOWN,
};

const EVENT_TYPE_A: EventType = 10;
const EVENT_TYPE_B: EventType = 20;

/// Test participant: subscribes to one type on init, optionally enables
/// scheduling, records every non-shutdown event it drains, and detaches
/// itself on the shutdown event.
struct Recorder {
    endpoint: Endpoint,
    interest: EventType,
    wants_scheduling: bool,
    ready: AtomicBool,
    seen: Mutex<Vec<u64>>,
}

impl Recorder {
    fn new(interest: EventType, wants_scheduling: bool) -> Arc<Self> {
        Arc::new(Self {
            endpoint: Endpoint::new(),
            interest,
            wants_scheduling,
            ready: AtomicBool::new(false),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn seen_ids(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Participant for Recorder {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn init(&self) -> Result<(), ParticipantError> {
        self.endpoint.subscribe(self.interest)?;
        if self.wants_scheduling {
            self.endpoint.enable_scheduling()?;
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn schedule(&self) -> Result<(), ParticipantError> {
        loop {
            let event = {
                let mut queue = self.endpoint.lock_queue();
                queue.fetch()
            };
            let Some(event) = event else { break };

            if event.event_type() == EVENT_TYPE_SHUTDOWN {
                self.endpoint.unsubscribe_all()?;
                self.endpoint.disable_scheduling()?;
            } else {
                self.seen.lock().unwrap().push(event.id());
            }
        }
        Ok(())
    }
}

/// Participant that connects a child participant from inside its own init.
struct Chain {
    endpoint: Endpoint,
    child: Arc<Recorder>,
    ready: AtomicBool,
}

#[async_trait]
impl Participant for Chain {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn init(&self) -> Result<(), ParticipantError> {
        self.endpoint.subscribe(EVENT_TYPE_A)?;
        self.endpoint.connect(self.child.clone())?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn schedule(&self) -> Result<(), ParticipantError> {
        Ok(())
    }
}

fn fast_manager() -> Manager {
    Manager::with_config(ManagerConfig {
        tick: Duration::from_millis(10),
        poll: Duration::from_millis(10),
        handshake: Duration::from_secs(6),
    })
}

async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        time::sleep(Duration::from_millis(5)).await;
    }
    true
}

#[tokio::test]
async fn starts_stops_and_restarts() {
    let manager = fast_manager();
    assert!(!manager.is_running());

    manager.start().await.unwrap();
    assert!(manager.is_running());

    manager.stop().await.unwrap();
    assert!(!manager.is_running());

    manager.start().await.unwrap();
    assert!(manager.is_running());
    manager.stop().await.unwrap();
}

#[tokio::test]
async fn second_start_reports_already_running() {
    let manager = fast_manager();
    manager.start().await.unwrap();

    let err = manager.start().await.unwrap_err();
    assert_eq!(err.as_label(), "loop_already_running");

    manager.stop().await.unwrap();
    assert!(!manager.is_running());
}

#[tokio::test]
async fn delivers_by_type_and_converges_on_shutdown() {
    let manager = fast_manager();
    assert!(manager.empty().await);

    let first = Recorder::new(EVENT_TYPE_A, true);
    let second = Recorder::new(EVENT_TYPE_B, true);
    manager.connect(first.clone());
    manager.connect(second.clone());

    // Commands cannot drain before the scheduling loop runs.
    assert!(!manager.empty().await);

    manager.start().await.unwrap();
    assert!(manager.is_running());
    assert!(
        wait_until(
            || first.is_ready() && second.is_ready(),
            Duration::from_secs(2)
        )
        .await
    );

    let event_a = Arc::new(Event::new(EVENT_TYPE_A));
    let event_b = Arc::new(Event::new(EVENT_TYPE_B));
    manager.emit(event_a.clone());
    manager.emit(event_b.clone());
    manager.emit(Event::new(EVENT_TYPE_SHUTDOWN));

    assert!(manager.wait_empty(Duration::from_secs(3)).await);
    assert!(manager.empty().await);

    assert_eq!(first.seen_ids(), vec![event_a.id()]);
    assert_eq!(second.seen_ids(), vec![event_b.id()]);

    manager.stop().await.unwrap();
    assert!(!manager.is_running());
}

#[tokio::test]
async fn shutdown_alone_detaches_all_subscriptions() {
    let manager = fast_manager();
    let first = Recorder::new(EVENT_TYPE_A, true);
    let second = Recorder::new(EVENT_TYPE_B, true);
    manager.connect(first.clone());
    manager.connect(second.clone());
    manager.start().await.unwrap();
    assert!(
        wait_until(
            || first.is_ready() && second.is_ready(),
            Duration::from_secs(2)
        )
        .await
    );

    manager.emit(Event::new(EVENT_TYPE_SHUTDOWN));

    assert!(manager.wait_empty(Duration::from_secs(3)).await);
    assert!(first.seen_ids().is_empty());
    assert!(second.seen_ids().is_empty());

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn emitter_never_receives_its_own_event() {
    let manager = fast_manager();
    let emitter = Recorder::new(EVENT_TYPE_A, true);
    let listener = Recorder::new(EVENT_TYPE_A, true);
    manager.connect(emitter.clone());
    manager.connect(listener.clone());
    manager.start().await.unwrap();

    assert!(
        wait_until(
            || emitter.is_ready() && listener.is_ready(),
            Duration::from_secs(2)
        )
        .await
    );

    let event = Arc::new(Event::new(EVENT_TYPE_A));
    emitter.endpoint().emit(event.clone()).unwrap();

    assert!(
        wait_until(|| !listener.seen_ids().is_empty(), Duration::from_secs(2)).await,
        "listener should observe the event"
    );
    assert_eq!(listener.seen_ids(), vec![event.id()]);

    // One more tick for any (wrong) echo to surface.
    time::sleep(Duration::from_millis(50)).await;
    assert!(emitter.seen_ids().is_empty());

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn queued_events_keep_emission_order_until_drained() {
    let manager = fast_manager();
    let recorder = Recorder::new(30, false);
    manager.connect(recorder.clone());
    manager.start().await.unwrap();

    assert!(wait_until(|| recorder.is_ready(), Duration::from_secs(2)).await);

    let events: Vec<Arc<Event>> = (0..3).map(|_| Arc::new(Event::new(30))).collect();
    for event in &events {
        manager.emit(event.clone());
    }

    // Never scheduled, so the mailbox holds everything until we drain it.
    assert!(
        wait_until(
            || recorder.endpoint().mailbox().len() == 3,
            Duration::from_secs(2)
        )
        .await
    );

    let mut queue = recorder.endpoint().lock_queue();
    for expected in &events {
        assert_eq!(queue.fetch().unwrap().id(), expected.id());
    }
    assert!(queue.fetch().is_none());
    drop(queue);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn disconnect_erases_routing_and_scheduling() {
    let manager = fast_manager();
    let recorder = Recorder::new(EVENT_TYPE_A, true);
    manager.connect(recorder.clone());
    manager.start().await.unwrap();

    assert!(wait_until(|| recorder.is_ready(), Duration::from_secs(2)).await);
    let assigned_id = recorder.endpoint().id();
    assert!(assigned_id >= 1);

    manager.disconnect(recorder.clone());
    assert!(
        wait_until(
            || !recorder.endpoint().is_attached(),
            Duration::from_secs(2)
        )
        .await
    );

    // No routing entry is left behind, scheduling has stopped, the id stays.
    assert!(manager.empty().await);
    assert!(!recorder.endpoint().is_scheduled());
    assert_eq!(recorder.endpoint().id(), assigned_id);

    manager.emit(Event::new(EVENT_TYPE_A));
    time::sleep(Duration::from_millis(50)).await;
    assert!(recorder.seen_ids().is_empty());
    assert!(!recorder.endpoint().has_events());

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn init_can_connect_another_participant() {
    let manager = fast_manager();
    let child = Recorder::new(50, true);
    let chain = Arc::new(Chain {
        endpoint: Endpoint::new(),
        child: child.clone(),
        ready: AtomicBool::new(false),
    });

    manager.connect(chain.clone());
    manager.start().await.unwrap();

    assert!(wait_until(|| child.is_ready(), Duration::from_secs(2)).await);
    assert!(chain.ready.load(Ordering::Acquire));

    let parent_id = chain.endpoint().id();
    let child_id = child.endpoint().id();
    assert!(parent_id >= 1);
    assert!(child_id > parent_id);

    let event = Arc::new(Event::new(50));
    manager.emit(event.clone());
    assert!(wait_until(|| !child.seen_ids().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(child.seen_ids(), vec![event.id()]);

    manager.stop().await.unwrap();
}

#[test]
fn detached_endpoint_rejects_outward_calls() {
    let recorder = Recorder::new(EVENT_TYPE_A, false);
    let endpoint = recorder.endpoint();

    assert!(!endpoint.is_attached());
    assert!(matches!(
        endpoint.subscribe(EVENT_TYPE_A),
        Err(ParticipantError::Detached)
    ));
    assert!(matches!(
        endpoint.emit(Event::new(EVENT_TYPE_A)),
        Err(ParticipantError::Detached)
    ));
    assert!(matches!(
        endpoint.enable_scheduling(),
        Err(ParticipantError::Detached)
    ));
    assert!(matches!(
        endpoint.connect(Recorder::new(EVENT_TYPE_B, false)),
        Err(ParticipantError::Detached)
    ));
}

#[tokio::test]
async fn duplicate_subscription_delivers_once() {
    let manager = fast_manager();
    let recorder = Recorder::new(60, false);

    // Direct subscription does not require a connected participant.
    manager.subscribe(60, recorder.clone());
    manager.subscribe(60, recorder.clone());
    manager.start().await.unwrap();

    manager.emit(Event::new(60));
    assert!(
        wait_until(
            || recorder.endpoint().has_events(),
            Duration::from_secs(2)
        )
        .await
    );
    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.endpoint().mailbox().len(), 1);

    manager.unsubscribe(60, recorder.clone());
    assert!(manager.empty().await);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn wait_empty_times_out_while_subscriptions_remain() {
    let manager = fast_manager();
    let recorder = Recorder::new(EVENT_TYPE_A, true);
    manager.connect(recorder.clone());
    manager.start().await.unwrap();

    assert!(wait_until(|| recorder.is_ready(), Duration::from_secs(2)).await);
    assert!(!manager.wait_empty(Duration::from_millis(100)).await);

    manager.stop().await.unwrap();
}
