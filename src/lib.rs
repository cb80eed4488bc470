//! # eventvisor
//!
//! **Eventvisor** is a lightweight in-process publish/subscribe event bus for
//! Rust: a central [`Manager`] routes typed [`Event`]s between registered
//! actors ([`Participant`]s) and schedules periodic work for those that
//! request it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Participant  │   │ Participant  │   │ Participant  │
//!     │  (actor #1)  │   │  (actor #2)  │   │  (actor #3)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ emit / subscribe │ connect / schedule│
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Manager (dispatcher)                                             │
//! │  - RoutingTable (event type → ordered subscriber list)            │
//! │  - EventQueue   (FIFO + wake signal)                              │
//! │  - CommandQueue (deferred connect/disconnect/scheduling changes)  │
//! │  - SchedulingSet + Registry (id allocation)                       │
//! └──────┬──────────────────────────────────────────────┬─────────────┘
//!        ▼                                              ▼
//!   dispatch loop                                 scheduling loop
//!   (drain events, fan out                        (tick: schedule() each
//!    to subscriber mailboxes,                      enabled participant,
//!    skip the emitter)                             then apply commands)
//!        │                                              │
//!        ▼                                              ▼
//!   [mailbox P1] [mailbox P2] ...              init() / schedule() hooks
//! ```
//!
//! ### Lifecycle
//! ```text
//! Manager::new() ──► connect(p) ──► start() ──► emit(...) ──► stop()
//!
//! connect(p) enqueues CONNECT; the scheduling loop then:
//!   ├─► installs p's manager link (auto-subscribes shutdown type 0)
//!   ├─► assigns the next participant id
//!   ├─► registers p
//!   └─► runs p.init()   (subscribe / enable_scheduling belong here)
//!
//! emit(event):
//!   └─► event queue ──► dispatch loop ──► mailbox of every subscriber
//!                                         of event's type except its emitter
//!
//! shutdown convention:
//!   emit(Event::new(EVENT_TYPE_SHUTDOWN)) ──► every participant sees it and
//!   unsubscribes itself / disables its scheduling ──► wait_empty() turns true
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types / traits            |
//! |------------------|----------------------------------------------------------|-------------------------------|
//! | **Dispatch**     | FIFO event routing with self-echo suppression.           | [`Manager`], [`Event`]        |
//! | **Participants** | Actor trait with `init`/`schedule` hooks and a mailbox.  | [`Participant`], [`Endpoint`] |
//! | **Scheduling**   | Periodic `schedule()` driven by the manager's tick loop. | [`Manager::schedule`]         |
//! | **Commands**     | Race-free structural changes via a single apply point.   | [`Manager::connect`]          |
//! | **Queueing**     | Per-participant inbound queue with a wait protocol.      | [`Mailbox`], [`MailboxGuard`] |
//! | **Errors**       | Typed errors for lifecycle and participant operations.   | [`RuntimeError`], [`ParticipantError`] |
//! | **Configuration**| Tick, poll, and handshake intervals.                     | [`ManagerConfig`]             |
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use eventvisor::{
//!     Endpoint, Event, Manager, Participant, ParticipantError, EVENT_TYPE_SHUTDOWN,
//! };
//!
//! const EVENT_TYPE_READING: u32 = 7;
//!
//! struct Sensor {
//!     endpoint: Endpoint,
//!     seen: AtomicBool,
//! }
//!
//! #[async_trait]
//! impl Participant for Sensor {
//!     fn endpoint(&self) -> &Endpoint {
//!         &self.endpoint
//!     }
//!
//!     async fn init(&self) -> Result<(), ParticipantError> {
//!         self.endpoint.subscribe(EVENT_TYPE_READING)?;
//!         self.endpoint.enable_scheduling()?;
//!         Ok(())
//!     }
//!
//!     async fn schedule(&self) -> Result<(), ParticipantError> {
//!         loop {
//!             let event = {
//!                 let mut queue = self.endpoint.lock_queue();
//!                 queue.fetch()
//!             };
//!             let Some(event) = event else { break };
//!
//!             if event.event_type() == EVENT_TYPE_SHUTDOWN {
//!                 self.endpoint.unsubscribe_all()?;
//!                 self.endpoint.disable_scheduling()?;
//!             } else {
//!                 self.seen.store(true, Ordering::Release);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Manager::new();
//!     let sensor = Arc::new(Sensor {
//!         endpoint: Endpoint::new(),
//!         seen: AtomicBool::new(false),
//!     });
//!
//!     manager.connect(sensor.clone());
//!     manager.start().await?;
//!
//!     manager.emit(Event::new(EVENT_TYPE_READING));
//!     manager.emit(Event::new(EVENT_TYPE_SHUTDOWN));
//!
//!     assert!(manager.wait_empty(Duration::from_secs(3)).await);
//!     assert!(sensor.seen.load(Ordering::Acquire));
//!
//!     manager.stop().await?;
//!     assert!(!manager.is_running());
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod participants;

// ---- Public re-exports ----

pub use core::{Manager, ManagerConfig};
pub use error::{EventError, LoopSide, ParticipantError, RuntimeError};
pub use events::{Event, EventType, EVENT_TYPE_SHUTDOWN};
pub use participants::{Endpoint, Mailbox, MailboxGuard, Participant};
