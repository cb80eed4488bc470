//! # Example: ping_pong
//!
//! Two participants playing ping-pong over the event bus.
//!
//! Shows how to:
//! - Implement the [`Participant`] trait with both hooks.
//! - Subscribe and enable scheduling from `init()`.
//! - Drain the mailbox inside `schedule()` and answer with
//!   [`Event::response_to`].
//! - Converge on the shutdown broadcast and `wait_empty`.
//!
//! ## Flow
//! ```text
//! Pinger.schedule() ── emit(PING) ──► dispatch ──► Ponger mailbox
//! Ponger.schedule() ── emit(PONG response) ──► dispatch ──► Pinger mailbox
//! main ──────────────── emit(shutdown) ──► both detach ──► wait_empty
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example ping_pong
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventvisor::{
    Endpoint, Event, EventType, Manager, Participant, ParticipantError, EVENT_TYPE_SHUTDOWN,
};

const EVENT_TYPE_PING: EventType = 1;
const EVENT_TYPE_PONG: EventType = 2;

/// Serves one PING per tick, up to a fixed rally length, and listens for
/// PONG responses.
struct Pinger {
    endpoint: Endpoint,
    rallies: AtomicU32,
}

#[async_trait]
impl Participant for Pinger {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn init(&self) -> Result<(), ParticipantError> {
        self.endpoint.subscribe(EVENT_TYPE_PONG)?;
        self.endpoint.enable_scheduling()?;
        Ok(())
    }

    async fn schedule(&self) -> Result<(), ParticipantError> {
        loop {
            let event = {
                let mut queue = self.endpoint.lock_queue();
                queue.fetch()
            };
            let Some(event) = event else { break };

            match event.event_type() {
                EVENT_TYPE_SHUTDOWN => {
                    self.endpoint.unsubscribe_all()?;
                    self.endpoint.disable_scheduling()?;
                    return Ok(());
                }
                EVENT_TYPE_PONG => {
                    println!("[pinger] pong (response to {})", event.response_id().unwrap_or(0));
                }
                _ => {}
            }
        }

        if self.rallies.fetch_add(1, Ordering::Relaxed) < 3 {
            let ping = Event::new(EVENT_TYPE_PING);
            println!("[pinger] ping {}", ping.id());
            self.endpoint.emit(ping)?;
        }
        Ok(())
    }
}

/// Answers every PING with a PONG response event.
struct Ponger {
    endpoint: Endpoint,
}

#[async_trait]
impl Participant for Ponger {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn init(&self) -> Result<(), ParticipantError> {
        self.endpoint.subscribe(EVENT_TYPE_PING)?;
        self.endpoint.enable_scheduling()?;
        Ok(())
    }

    async fn schedule(&self) -> Result<(), ParticipantError> {
        loop {
            let event = {
                let mut queue = self.endpoint.lock_queue();
                queue.fetch()
            };
            let Some(event) = event else { break };

            match event.event_type() {
                EVENT_TYPE_SHUTDOWN => {
                    self.endpoint.unsubscribe_all()?;
                    self.endpoint.disable_scheduling()?;
                    return Ok(());
                }
                EVENT_TYPE_PING => {
                    println!("[ponger] answering ping {}", event.id());
                    self.endpoint.emit(Event::response_to(EVENT_TYPE_PONG, &event))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manager = Manager::new();

    let pinger = Arc::new(Pinger {
        endpoint: Endpoint::new(),
        rallies: AtomicU32::new(0),
    });
    let ponger = Arc::new(Ponger {
        endpoint: Endpoint::new(),
    });

    manager.connect(pinger.clone());
    manager.connect(ponger.clone());
    manager.start().await?;

    tokio::time::sleep(Duration::from_millis(800)).await;

    manager.emit(Event::new(EVENT_TYPE_SHUTDOWN));
    if manager.wait_empty(Duration::from_secs(3)).await {
        println!("rally over, everyone detached");
    }

    manager.stop().await?;
    Ok(())
}
