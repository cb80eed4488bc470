//! Event data model.
//!
//! This module groups the event **data model**: the [`Event`] value routed
//! through the manager, the [`EventType`] tag, and the reserved
//! [`EVENT_TYPE_SHUTDOWN`] protocol constant.
//!
//! ## Quick reference
//! - **Producers**: participants via [`Endpoint::emit`](crate::Endpoint::emit),
//!   application code via [`Manager::emit`](crate::Manager::emit).
//! - **Consumers**: the dispatch loop (routing), participant mailboxes
//!   (delivery), participant code (draining).

mod event;

pub use event::{Event, EventType, EVENT_TYPE_SHUTDOWN};
