//! # Core participant trait.
//!
//! `Participant` is the extension point for plugging actors into the event
//! system. A concrete participant embeds an [`Endpoint`] (its link to the
//! manager plus its mailbox) and implements the two lifecycle hooks.
//!
//! ## Contract
//! - [`init`](Participant::init) runs exactly once, on the manager's
//!   scheduling loop, while the CONNECT command is processed: after the
//!   manager link and participant id are in place, before the participant is
//!   visible to any routing lookup. It is the place to subscribe and to
//!   enable scheduling.
//! - [`schedule`](Participant::schedule) runs on every tick of the shared
//!   scheduling loop once scheduling is enabled. It **must return promptly**:
//!   a long-running implementation starves every other scheduled participant
//!   and delays command processing for that tick. Drain a few events and
//!   return.

use async_trait::async_trait;

use crate::error::ParticipantError;

use super::Endpoint;

/// An actor that can subscribe to event types, emit events, and optionally be
/// scheduled for periodic work.
///
/// Both hooks are mandatory: there is no meaningful default for either, so
/// the contract is enforced at the type level rather than checked at runtime.
/// A participant that never enables scheduling can implement
/// [`schedule`](Participant::schedule) as an immediate `Ok(())`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use eventvisor::{Endpoint, Participant, ParticipantError, EVENT_TYPE_SHUTDOWN};
///
/// struct Sensor {
///     endpoint: Endpoint,
/// }
///
/// #[async_trait]
/// impl Participant for Sensor {
///     fn endpoint(&self) -> &Endpoint {
///         &self.endpoint
///     }
///
///     async fn init(&self) -> Result<(), ParticipantError> {
///         self.endpoint.subscribe(42)?;
///         self.endpoint.enable_scheduling()?;
///         Ok(())
///     }
///
///     async fn schedule(&self) -> Result<(), ParticipantError> {
///         loop {
///             let event = {
///                 let mut queue = self.endpoint.lock_queue();
///                 queue.fetch()
///             };
///             let Some(event) = event else { break };
///
///             if event.event_type() == EVENT_TYPE_SHUTDOWN {
///                 self.endpoint.unsubscribe_all()?;
///                 self.endpoint.disable_scheduling()?;
///             } else {
///                 // react to the event...
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Participant: Send + Sync + 'static {
    /// Returns the participant's endpoint (manager link + mailbox).
    fn endpoint(&self) -> &Endpoint;

    /// Invoked exactly once by the manager while connecting this participant.
    ///
    /// The manager link and participant id are already in place; subscribing
    /// and enabling scheduling from here cannot fail with
    /// [`ParticipantError::Detached`].
    async fn init(&self) -> Result<(), ParticipantError>;

    /// Invoked on every scheduling tick while scheduling is enabled.
    ///
    /// Runs on the single shared scheduling loop; return promptly.
    async fn schedule(&self) -> Result<(), ParticipantError>;

    /// Human-readable name (for diagnostics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
