//! Connected-participant registry and id allocation.
//!
//! Tracks which participants are currently connected and hands out their
//! administrative ids. Ids start at 1, grow monotonically, and are never
//! reused while the manager lives: a disconnect frees the registry slot but
//! not the id.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::participants::Participant;

struct RegistryState {
    participants: Vec<Arc<dyn Participant>>,
    next_id: u32,
}

/// Registry of currently connected participants.
pub(crate) struct Registry {
    state: Mutex<RegistryState>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                participants: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Registry {
    /// True if `participant` is currently registered.
    pub(crate) fn contains(&self, participant: &Arc<dyn Participant>) -> bool {
        self.lock()
            .participants
            .iter()
            .any(|p| Arc::ptr_eq(p, participant))
    }

    /// Hands out the next administrative id.
    pub(crate) fn allocate_id(&self) -> u32 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    /// Registers a participant.
    pub(crate) fn insert(&self, participant: Arc<dyn Participant>) {
        self.lock().participants.push(participant);
    }

    /// Deregisters a participant; returns whether it was registered.
    pub(crate) fn remove(&self, participant: &Arc<dyn Participant>) -> bool {
        let mut state = self.lock();
        let before = state.participants.len();
        state.participants.retain(|p| !Arc::ptr_eq(p, participant));
        state.participants.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParticipantError;
    use crate::participants::Endpoint;
    use async_trait::async_trait;

    struct Probe {
        endpoint: Endpoint,
    }

    #[async_trait]
    impl Participant for Probe {
        fn endpoint(&self) -> &Endpoint {
            &self.endpoint
        }

        async fn init(&self) -> Result<(), ParticipantError> {
            Ok(())
        }

        async fn schedule(&self) -> Result<(), ParticipantError> {
            Ok(())
        }
    }

    fn probe() -> Arc<dyn Participant> {
        Arc::new(Probe {
            endpoint: Endpoint::new(),
        })
    }

    #[test]
    fn ids_start_at_one_and_grow_monotonically() {
        let registry = Registry::default();
        assert_eq!(registry.allocate_id(), 1);
        assert_eq!(registry.allocate_id(), 2);
        assert_eq!(registry.allocate_id(), 3);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let registry = Registry::default();
        let participant = probe();

        let first = registry.allocate_id();
        registry.insert(Arc::clone(&participant));
        assert!(registry.remove(&participant));

        assert!(registry.allocate_id() > first);
    }

    #[test]
    fn contains_tracks_registration_by_identity() {
        let registry = Registry::default();
        let registered = probe();
        let stranger = probe();

        registry.insert(Arc::clone(&registered));

        assert!(registry.contains(&registered));
        assert!(!registry.contains(&stranger));
        assert!(!registry.remove(&stranger));
        assert!(registry.remove(&registered));
        assert!(!registry.contains(&registered));
    }
}
