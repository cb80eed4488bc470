//! # Participants: actors on the event bus.
//!
//! This module provides the [`Participant`] trait, the [`Endpoint`] state a
//! concrete participant embeds, and the [`Mailbox`] inbound-queue protocol.
//!
//! ## Architecture
//! ```text
//! concrete participant
//!   ├── Endpoint ── manager link ──► Manager (subscribe / emit / commands)
//!   │      └────── Mailbox ◄─────── dispatch loop (deliver)
//!   ├── init()      invoked once while CONNECT is processed
//!   └── schedule()  invoked per tick while scheduling is enabled
//! ```
//!
//! Participant logic executes on the manager's scheduling loop (via
//! `schedule()`), not on a thread of its own; the mailbox wait calls exist
//! for participants that drain from their own tasks instead.

mod endpoint;
mod mailbox;
mod participant;

pub use endpoint::Endpoint;
pub use mailbox::{Mailbox, MailboxGuard};
pub use participant::Participant;
