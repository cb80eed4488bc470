//! Error types used by the eventvisor runtime and participants.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: errors raised by the manager's loop lifecycle (start/stop).
//! - [`ParticipantError`]: errors raised by participant-side operations.
//! - [`EventError`]: errors raised by event accessors.
//!
//! All types provide an `as_label` helper returning a short stable string for
//! logging/metrics.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Identifies one of the manager's two processing loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSide {
    /// The event dispatch loop (drains the event queue, fans out to subscribers).
    Dispatch,
    /// The scheduling loop (periodic ticks plus command processing).
    Scheduling,
}

impl fmt::Display for LoopSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopSide::Dispatch => write!(f, "dispatch"),
            LoopSide::Scheduling => write!(f, "scheduling"),
        }
    }
}

/// # Errors produced by the manager's loop lifecycle.
///
/// These represent failures of the start/stop handshake protocol. They are
/// fatal configuration errors, not retryable conditions: the manager performs
/// no implicit retry beyond the self-rollback in
/// [`Manager::start`](crate::Manager::start).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A loop was asked to start while already running.
    #[error("{side} loop is already running")]
    AlreadyRunning {
        /// Which loop was already running.
        side: LoopSide,
    },

    /// A loop did not report running within the handshake ceiling.
    #[error("{side} loop did not report running within {ceiling:?}")]
    StartTimeout {
        /// Which loop failed to come up.
        side: LoopSide,
        /// The configured handshake ceiling.
        ceiling: Duration,
    },

    /// A loop did not stop within the handshake ceiling.
    #[error("{side} loop did not stop within {ceiling:?}")]
    StopTimeout {
        /// Which loop failed to wind down.
        side: LoopSide,
        /// The configured handshake ceiling.
        ceiling: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::{LoopSide, RuntimeError};
    ///
    /// let err = RuntimeError::AlreadyRunning { side: LoopSide::Dispatch };
    /// assert_eq!(err.as_label(), "loop_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning { .. } => "loop_already_running",
            RuntimeError::StartTimeout { .. } => "loop_start_timeout",
            RuntimeError::StopTimeout { .. } => "loop_stop_timeout",
        }
    }
}

/// # Errors produced by participant-side operations.
///
/// Every outward call on an [`Endpoint`](crate::Endpoint), from subscribing
/// and emitting to connecting other participants, requires an attached
/// manager. Calls on a detached endpoint fail with
/// [`ParticipantError::Detached`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParticipantError {
    /// The participant is not connected to a manager.
    #[error("participant is not connected to a manager")]
    Detached,
}

impl ParticipantError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ParticipantError::Detached => "participant_detached",
        }
    }
}

/// # Errors produced by event accessors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventError {
    /// `response_id` was read on an event that is not a response.
    #[error("event is not a response")]
    NotAResponse,
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::NotAResponse => "event_not_a_response",
        }
    }
}
